/**
 * Media Upload Routes
 * Thin proxy to the media host: POST forwards one file as a data URI,
 * DELETE forwards a destroy by public id. Requires an admin session.
 */
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ErrorResponse;
use crate::forms::FormData;
use crate::gate::ApiSession;
use crate::media::{self, MediaError, DEFAULT_FOLDER};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DestroyQuery {
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DestroyResponse {
    pub result: serde_json::Value,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Upstream message when the host gave one.
fn upstream_failure(e: &MediaError, fallback: &str) -> Response {
    let message = match e {
        MediaError::Rejected { message, .. } if !message.is_empty() => message.clone(),
        MediaError::NotConfigured => e.user_message(),
        _ => fallback.to_string(),
    };
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    ApiSession(identity): ApiSession,
    multipart: Multipart,
) -> Response {
    let form = match FormData::from_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let Some(file) = form.file("file") else {
        return error(StatusCode::BAD_REQUEST, "No file provided");
    };
    let folder = form
        .non_empty("folder")
        .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

    match media::upload_file(state.media.as_ref(), file, &folder).await {
        Ok(asset) => {
            tracing::debug!(user_id = %identity.user_id, "upload served");
            (StatusCode::OK, Json(asset)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, %folder, "media upload failed");
            upstream_failure(&e, "Upload failed")
        }
    }
}

/// DELETE /api/upload?public_id=...
pub async fn destroy(
    State(state): State<AppState>,
    ApiSession(identity): ApiSession,
    Query(query): Query<DestroyQuery>,
) -> Response {
    let Some(public_id) = query.public_id.filter(|id| !id.trim().is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "No public_id provided");
    };

    match state.media.destroy(&public_id).await {
        Ok(result) => {
            tracing::info!(user_id = %identity.user_id, %public_id, "media destroyed");
            (StatusCode::OK, Json(DestroyResponse { result })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, %public_id, "media destroy failed");
            upstream_failure(&e, "Delete failed")
        }
    }
}
