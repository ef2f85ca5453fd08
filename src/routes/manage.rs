/**
 * Manager Routes
 * One router per table-backed resource: list, create and edit dialogs,
 * multipart saves and confirmed deletes. Every mutation answers with the
 * freshly re-read list.
 */
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, ErrorResponse};
use crate::forms::FormData;
use crate::gate::AdminSession;
use crate::manager::{self, Card, Collection, Listing, Resource, SaveFailure};
use crate::session::Identity;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Result of a successful create, update or delete
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub notice: String,
    pub items: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_notice: Option<String>,
}

impl MutationResponse {
    pub fn new(notice: &str, listing: Listing) -> Self {
        Self {
            notice: notice.to_string(),
            items: listing.items,
            list_notice: listing.notice,
        }
    }
}

/// A delete that was not confirmed; nothing was written
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub deleted: bool,
    pub confirm: String,
    pub items: Vec<Card>,
}

#[derive(Debug, Serialize)]
pub struct DialogResponse<D: Serialize> {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub draft: D,
    pub choices: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SaveErrorResponse<D: Serialize> {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<D>,
}

fn save_failed<D: Serialize + std::fmt::Debug>(failure: SaveFailure<D>) -> Response {
    let status = failure.error.status();
    if status.is_server_error() {
        tracing::error!(error = %failure.error, "save failed");
    }
    (
        status,
        Json(SaveErrorResponse {
            error: failure.error.public_message(),
            draft: failure.draft,
        }),
    )
        .into_response()
}

// ============================================================================
// Shared by every collection
// ============================================================================

/// Delete `id` when confirmed; otherwise answer with the prompt and the
/// current list without writing.
pub async fn delete_confirmed<C: Collection>(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    confirm: bool,
) -> Response {
    if !confirm {
        let listing = manager::list::<C>(state, identity).await;
        return (
            StatusCode::OK,
            Json(ConfirmResponse {
                deleted: false,
                confirm: C::CONFIRM_PROMPT.to_string(),
                items: listing.items,
            }),
        )
            .into_response();
    }

    match manager::delete::<C>(state, identity, id).await {
        Ok(listing) => (
            StatusCode::OK,
            Json(MutationResponse::new(C::DELETED, listing)),
        )
            .into_response(),
        Err(e) => (
            e.status(),
            Json(ErrorResponse {
                error: C::DELETE_FAILED.to_string(),
                message: Some(e.public_message()),
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
) -> impl IntoResponse {
    Json(manager::list::<R>(&state, &identity).await)
}

/// GET /new
pub async fn new_dialog<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
) -> impl IntoResponse {
    let existing = match state.tables.count(R::TABLE, Some(&identity.access_token)).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(table = %R::TABLE, error = %e, "count for new draft failed");
            0
        }
    };
    Json(DialogResponse {
        mode: "create",
        id: None,
        draft: R::default_draft(existing),
        choices: R::choices(),
    })
}

/// GET /{id}/edit
pub async fn edit_dialog<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = manager::find::<R>(&state, &identity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(R::NOUN.to_string()))?;
    Ok(Json(DialogResponse {
        mode: "edit",
        id: Some(R::id(&row)),
        draft: R::to_draft(&row),
        choices: R::choices(),
    })
    .into_response())
}

/// POST /
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = FormData::from_multipart(multipart).await?;
    Ok(match manager::create::<R>(&state, &identity, &form).await {
        Ok(listing) => (
            StatusCode::CREATED,
            Json(MutationResponse::new(R::CREATED, listing)),
        )
            .into_response(),
        Err(failure) => save_failed(failure),
    })
}

/// POST /{id}
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = FormData::from_multipart(multipart).await?;
    Ok(match manager::update::<R>(&state, &identity, id, &form).await {
        Ok(listing) => (
            StatusCode::OK,
            Json(MutationResponse::new(R::UPDATED, listing)),
        )
            .into_response(),
        Err(failure) => save_failed(failure),
    })
}

/// DELETE /{id}?confirm=true
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    AdminSession(identity): AdminSession,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    delete_confirmed::<R>(&state, &identity, id, query.confirm).await
}

pub fn resource_router<R: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/new", get(new_dialog::<R>))
        .route("/{id}", post(update::<R>).delete(delete::<R>))
        .route("/{id}/edit", get(edit_dialog::<R>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::Role;
    use crate::backend::{Table, TableApi};
    use crate::manager::{clubs::Clubs, events::Events, team::Team};
    use crate::test_support::{
        multipart_request, send_json, session_cookie, signed_in, test_state, Part,
    };
    use axum::body::Body;
    use axum::http::Request;

    fn events_app(state: AppState) -> Router {
        Router::new()
            .nest("/events", resource_router::<Events>())
            .nest("/clubs", resource_router::<Clubs>())
            .nest("/team", resource_router::<Team>())
            .with_state(state)
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_edit_dialog_round() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let cookie = session_cookie(&admin);

        let (status, body) = send_json(
            events_app(state.clone()),
            multipart_request(
                "POST",
                "/events",
                Some(&cookie),
                &[
                    Part::text("title", "Demo Day"),
                    Part::text("event_date", "2025-12-01T10:00"),
                    Part::text("status", "Upcoming"),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notice"], "Event created successfully");
        let id = body["items"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send_json(
            events_app(state.clone()),
            get_with(&format!("/events/{id}/edit"), &cookie),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "edit");
        assert_eq!(body["draft"]["title"], "Demo Day");
        assert_eq!(body["draft"]["created_by"], admin.user_id.to_string());

        let (status, body) = send_json(
            events_app(state),
            multipart_request(
                "POST",
                &format!("/events/{id}"),
                Some(&cookie),
                &[
                    Part::text("title", "Demo Day 2"),
                    Part::text("event_date", "2025-12-01T10:00"),
                    Part::text("status", "Upcoming"),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notice"], "Event updated successfully");
    }

    #[tokio::test]
    async fn test_validation_error_is_unprocessable_with_no_write() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let (status, body) = send_json(
            events_app(state),
            multipart_request(
                "POST",
                "/clubs",
                Some(&session_cookie(&admin)),
                &[Part::text("type", "club")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("required"));
        assert!(backend.rows(Table::Clubs).await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_returns_draft_for_retry() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        backend.fail_writes(Table::TeamMembers, true).await;
        let (status, body) = send_json(
            events_app(state),
            multipart_request(
                "POST",
                "/team",
                Some(&session_cookie(&admin)),
                &[Part::text("name", "Asha"), Part::text("position", "Secretary")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["draft"]["name"], "Asha");
    }

    #[tokio::test]
    async fn test_new_dialog_orders_team_after_existing() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        for name in ["A", "B"] {
            backend
                .insert(
                    Table::TeamMembers,
                    serde_json::json!({ "name": name, "position": "Lead", "category": "Lead", "order_index": 0 }),
                    None,
                )
                .await
                .unwrap();
        }
        let (_, body) =
            send_json(events_app(state), get_with("/team/new", &session_cookie(&admin))).await;
        assert_eq!(body["mode"], "create");
        assert_eq!(body["draft"]["order_index"], 2);
        assert_eq!(body["draft"]["category"], "WebOps");
    }

    #[tokio::test]
    async fn test_edit_of_unknown_row_is_not_found() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let (status, body) = send_json(
            events_app(state),
            get_with(&format!("/events/{}/edit", Uuid::new_v4()), &session_cookie(&admin)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Event not found");
    }

    #[tokio::test]
    async fn test_delete_failure_reports_and_keeps_row() {
        let (state, backend, _) = test_state().await;
        let admin = signed_in(&state, &backend, Role::Admin).await;
        let row = backend
            .insert(
                Table::Clubs,
                serde_json::json!({ "name": "Quiz Club", "type": "club" }),
                None,
            )
            .await
            .unwrap();
        backend.fail_writes(Table::Clubs, true).await;

        let req = Request::delete(format!("/clubs/{}?confirm=true", row["id"].as_str().unwrap()))
            .header("cookie", session_cookie(&admin))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(events_app(state), req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to delete");
        assert_eq!(backend.rows(Table::Clubs).await.len(), 1);
    }
}
