/**
 * Admin Manager Routes
 * Superadmin-only: list admin profiles, create accounts, change roles and
 * remove profiles.
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::manage::{delete_confirmed, DeleteQuery, MutationResponse};
use crate::backend::models::Role;
use crate::error::{AppError, ErrorResponse};
use crate::gate::SuperadminSession;
use crate::manager::{self, admins, admins::Admins};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

/// GET /
pub async fn list(
    State(state): State<AppState>,
    SuperadminSession(identity): SuperadminSession,
) -> impl IntoResponse {
    Json(manager::list::<Admins>(&state, &identity).await)
}

/// POST /
pub async fn create(
    State(state): State<AppState>,
    SuperadminSession(identity): SuperadminSession,
    Json(request): Json<admins::NewAdmin>,
) -> Response {
    match admins::create(&state, &identity, request).await {
        Ok(listing) => (
            StatusCode::CREATED,
            Json(MutationResponse::new(admins::CREATED, listing)),
        )
            .into_response(),
        Err(e @ (AppError::BadRequest(_) | AppError::Validation(_))) => e.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "{}", admins::CREATE_FAILED);
            (
                e.status(),
                Json(ErrorResponse {
                    error: admins::CREATE_FAILED.to_string(),
                    message: Some(e.public_message()),
                }),
            )
                .into_response()
        }
    }
}

/// PATCH /{id}/role
pub async fn update_role(
    State(state): State<AppState>,
    SuperadminSession(identity): SuperadminSession,
    Path(id): Path<Uuid>,
    Json(change): Json<RoleChange>,
) -> Response {
    match admins::update_role(&state, &identity, id, change.role).await {
        Ok(listing) => (
            StatusCode::OK,
            Json(MutationResponse::new(admins::ROLE_UPDATED, listing)),
        )
            .into_response(),
        Err(e @ AppError::NotFound(_)) => e.into_response(),
        Err(e) => (
            e.status(),
            Json(ErrorResponse {
                error: admins::ROLE_UPDATE_FAILED.to_string(),
                message: Some(e.public_message()),
            }),
        )
            .into_response(),
    }
}

/// DELETE /{id}?confirm=true
/// Removes the profile only; the auth account stays.
pub async fn delete(
    State(state): State<AppState>,
    SuperadminSession(identity): SuperadminSession,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    let response = delete_confirmed::<Admins>(&state, &identity, id, query.confirm).await;
    if query.confirm && response.status().is_success() {
        // cached sessions still carry the removed role
        state.sessions.invalidate_user(id).await;
        tracing::info!(%id, "admin profile removed");
    }
    response
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", axum::routing::delete(delete))
        .route("/{id}/role", patch(update_role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{send, send_json, session_cookie, signed_in, test_state};
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::json;

    fn app(state: AppState) -> Router {
        Router::new().nest("/admins", router()).with_state(state)
    }

    fn json_request(method: &str, uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("cookie", cookie)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_admin_is_sent_back_to_dashboard() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let req = Request::get("/admins")
            .header("cookie", session_cookie(&admin))
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(app(state), req).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            headers.get(header::LOCATION).unwrap(),
            "/admin/dashboard?notice=superadmin_required"
        );
    }

    #[tokio::test]
    async fn test_create_admin_returns_created_notice() {
        let (state, backend, _) = test_state().await;
        let root = signed_in(&state, &backend, Role::Superadmin).await;
        let (status, body) = send_json(
            app(state),
            json_request(
                "POST",
                "/admins",
                &session_cookie(&root),
                json!({ "email": "new@bandipur.com", "password": "pw123456", "role": "admin" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notice"], admins::CREATED);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let (state, backend, _) = test_state().await;
        let root = signed_in(&state, &backend, Role::Superadmin).await;
        let (status, body) = send_json(
            app(state),
            json_request(
                "POST",
                "/admins",
                &session_cookie(&root),
                json!({ "email": "not-an-email", "password": "pw123456" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_duplicate_signup_reports_create_failure() {
        let (state, backend, _) = test_state().await;
        let root = signed_in(&state, &backend, Role::Superadmin).await;
        let body = json!({ "email": root.email, "password": "pw123456" });
        let (status, body) = send_json(
            app(state),
            json_request("POST", "/admins", &session_cookie(&root), body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], admins::CREATE_FAILED);
    }

    #[tokio::test]
    async fn test_role_change_and_unconfirmed_delete() {
        let (state, backend, _) = test_state().await;
        let root = signed_in(&state, &backend, Role::Superadmin).await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let cookie = session_cookie(&root);

        let (status, body) = send_json(
            app(state.clone()),
            json_request(
                "PATCH",
                &format!("/admins/{}/role", admin.user_id),
                &cookie,
                json!({ "role": "superadmin" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notice"], admins::ROLE_UPDATED);

        let req = Request::delete(format!("/admins/{}", admin.user_id))
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(app(state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], false);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleted_superadmin_loses_access() {
        let (state, backend, _) = test_state().await;
        let root = signed_in(&state, &backend, Role::Superadmin).await;
        let other = signed_in(&state, &backend, Role::Superadmin).await;
        let list_as_other = || {
            Request::get("/admins")
                .header("cookie", session_cookie(&other))
                .body(Body::empty())
                .unwrap()
        };

        let (status, _, _) = send(app(state.clone()), list_as_other()).await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::delete(format!("/admins/{}?confirm=true", other.user_id))
            .header("cookie", session_cookie(&root))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(app(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, headers, _) = send(app(state), list_as_other()).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            headers.get(header::LOCATION).unwrap(),
            "/admin/dashboard?notice=superadmin_required"
        );
    }
}
