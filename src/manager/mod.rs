//! Table-backed resource managers.
//!
//! A manager lists one table in a fixed order and runs create, update and
//! delete against it. Every mutation is followed by a fresh list query; local
//! state is never patched. [`Collection`] covers listing and deletion,
//! [`Resource`] adds the draft form for create and edit.

pub mod admins;
pub mod clubs;
pub mod events;
pub mod team;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::models::parse_rows;
use crate::backend::{BackendResult, OrderBy, Select, Table};
use crate::error::AppError;
use crate::forms::FormData;
use crate::image_upload::{self, ImageField};
use crate::session::Identity;
use crate::state::AppState;

/// Summary shown in a manager's grid
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

pub trait Collection: Send + Sync + 'static {
    type Row: DeserializeOwned + Serialize + Clone + Send + Sync;

    const TABLE: Table;
    const ORDER: OrderBy;
    const NOUN: &'static str;
    /// Plural used in messages, e.g. "team members".
    const LABEL: &'static str;
    const DELETED: &'static str;
    const DELETE_FAILED: &'static str;
    const CONFIRM_PROMPT: &'static str;

    fn id(row: &Self::Row) -> Uuid;
    fn card(row: &Self::Row) -> Card;

    fn fetch_failed() -> String {
        format!("Failed to fetch {}", Self::LABEL)
    }
}

pub trait Resource: Collection {
    type Draft: Serialize + Clone + std::fmt::Debug + Send + Sync;

    const CREATED: &'static str;
    const UPDATED: &'static str;
    const SAVE_FAILED: &'static str;
    const IMAGE_FIELD: Option<ImageField<'static>> = None;

    /// Draft for the create dialog. `existing` is the current row count.
    fn default_draft(existing: u64) -> Self::Draft;
    fn to_draft(row: &Self::Row) -> Self::Draft;

    /// Parse and check the submitted form. Errors are shown in the dialog.
    fn draft_from_form(form: &FormData) -> Result<Self::Draft, String>;

    fn image_slot(_draft: &mut Self::Draft) -> Option<&mut Option<String>> {
        None
    }

    fn stamp_creator(_draft: &mut Self::Draft, _identity: &Identity) {}

    /// Allowed values for select inputs.
    fn choices() -> Value {
        Value::Null
    }
}

/// A list as shown after any manager action
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Listing {
    pub items: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub async fn fetch_rows<C: Collection>(
    state: &AppState,
    token: Option<&str>,
) -> BackendResult<Vec<C::Row>> {
    let rows = state
        .tables
        .select(C::TABLE, &Select::all().order(C::ORDER), token)
        .await?;
    Ok(parse_rows(C::TABLE, rows))
}

/// Full list; a read failure degrades to an empty list with a notice.
pub async fn list<C: Collection>(state: &AppState, identity: &Identity) -> Listing {
    match fetch_rows::<C>(state, Some(&identity.access_token)).await {
        Ok(rows) => Listing {
            items: rows.iter().map(C::card).collect(),
            notice: None,
        },
        Err(e) => {
            tracing::warn!(table = %C::TABLE, error = %e, "list query failed");
            Listing {
                items: Vec::new(),
                notice: Some(C::fetch_failed()),
            }
        }
    }
}

pub async fn find<C: Collection>(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> BackendResult<Option<C::Row>> {
    let rows = state
        .tables
        .select(
            C::TABLE,
            &Select::all().eq("id", id.to_string()).limit(1),
            Some(&identity.access_token),
        )
        .await?;
    Ok(parse_rows::<C::Row>(C::TABLE, rows).into_iter().next())
}

/// A rejected save. The draft is returned when one could be built.
#[derive(Debug)]
pub struct SaveFailure<D: std::fmt::Debug> {
    pub error: AppError,
    pub draft: Option<D>,
}

impl<D: std::fmt::Debug> SaveFailure<D> {
    fn new(error: AppError, draft: Option<D>) -> Self {
        Self { error, draft }
    }
}

/// Build the draft from the form and resolve its image field.
async fn prepare<R: Resource>(
    state: &AppState,
    form: &FormData,
) -> Result<R::Draft, SaveFailure<R::Draft>> {
    let mut draft = R::draft_from_form(form)
        .map_err(|msg| SaveFailure::new(AppError::Validation(msg), None))?;

    if let Some(field) = R::IMAGE_FIELD {
        let current = image_upload::current_value(form, field);
        let change = image_upload::resolve(form, field, state.media.as_ref())
            .await
            .map_err(|e| SaveFailure::new(e.into(), Some(draft.clone())))?;
        if let Some(slot) = R::image_slot(&mut draft) {
            *slot = current;
            change.apply(slot);
        }
    }
    Ok(draft)
}

fn to_row<D: Serialize>(draft: &D) -> Result<Value, AppError> {
    serde_json::to_value(draft)
        .map_err(|e| AppError::BadRequest(format!("unserializable draft: {e}")))
}

pub async fn create<R: Resource>(
    state: &AppState,
    identity: &Identity,
    form: &FormData,
) -> Result<Listing, SaveFailure<R::Draft>> {
    let mut draft = prepare::<R>(state, form).await?;
    R::stamp_creator(&mut draft, identity);

    let row = to_row(&draft).map_err(|e| SaveFailure::new(e, Some(draft.clone())))?;
    match state
        .tables
        .insert(R::TABLE, row, Some(&identity.access_token))
        .await
    {
        Ok(stored) => {
            tracing::info!(table = %R::TABLE, id = ?stored.get("id"), "row created");
            Ok(list::<R>(state, identity).await)
        }
        Err(e) => {
            tracing::error!(table = %R::TABLE, error = %e, "{}", R::SAVE_FAILED);
            Err(SaveFailure::new(e.into(), Some(draft)))
        }
    }
}

pub async fn update<R: Resource>(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    form: &FormData,
) -> Result<Listing, SaveFailure<R::Draft>> {
    let draft = prepare::<R>(state, form).await?;
    let patch = to_row(&draft).map_err(|e| SaveFailure::new(e, Some(draft.clone())))?;

    match state
        .tables
        .update(R::TABLE, &id.to_string(), patch, Some(&identity.access_token))
        .await
    {
        Ok(rows) if rows.is_empty() => Err(SaveFailure::new(
            AppError::NotFound(R::NOUN.to_string()),
            Some(draft),
        )),
        Ok(_) => {
            tracing::info!(table = %R::TABLE, %id, "row updated");
            Ok(list::<R>(state, identity).await)
        }
        Err(e) => {
            tracing::error!(table = %R::TABLE, %id, error = %e, "{}", R::SAVE_FAILED);
            Err(SaveFailure::new(e.into(), Some(draft)))
        }
    }
}

pub async fn delete<C: Collection>(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<Listing, AppError> {
    state
        .tables
        .delete(C::TABLE, &id.to_string(), Some(&identity.access_token))
        .await
        .map_err(|e| {
            tracing::error!(table = %C::TABLE, %id, error = %e, "{}", C::DELETE_FAILED);
            AppError::from(e)
        })?;
    tracing::info!(table = %C::TABLE, %id, "row deleted");
    Ok(list::<C>(state, identity).await)
}

#[cfg(test)]
mod tests {
    use super::events::Events;
    use super::*;
    use crate::backend::TableApi;
    use crate::test_support::{signed_in, test_state};

    fn demo_day() -> FormData {
        FormData::default()
            .with_text("title", "Demo Day")
            .with_text("event_date", "2025-12-01T10:00")
            .with_text("status", "Upcoming")
    }

    #[tokio::test]
    async fn test_created_row_appears_in_list_and_delete_removes_it() {
        let (state, backend, media) = test_state().await;
        let identity = signed_in(&state, &backend, crate::backend::models::Role::Admin).await;

        let listing = create::<Events>(&state, &identity, &demo_day()).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].title, "Demo Day");
        assert_eq!(listing.items[0].tag.as_deref(), Some("Upcoming"));
        assert_eq!(media.upload_calls(), 0);

        let id = listing.items[0].id;
        let listing = delete::<Events>(&state, &identity, id).await.unwrap();
        assert!(listing.items.is_empty());
    }

    #[tokio::test]
    async fn test_validation_fails_before_any_write() {
        let (state, backend, _) = test_state().await;
        let identity = signed_in(&state, &backend, crate::backend::models::Role::Admin).await;

        let form = FormData::default().with_text("event_date", "2025-12-01T10:00");
        let failure = create::<Events>(&state, &identity, &form).await.unwrap_err();
        assert_eq!(failure.error.to_string(), "Title is required");
        assert!(backend.rows(Table::Events).await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_write_failure_keeps_draft() {
        let (state, backend, _) = test_state().await;
        let identity = signed_in(&state, &backend, crate::backend::models::Role::Admin).await;
        backend.fail_writes(Table::Events, true).await;

        let failure = create::<Events>(&state, &identity, &demo_day()).await.unwrap_err();
        assert!(matches!(failure.error, AppError::Backend(_)));
        assert_eq!(failure.draft.unwrap().title, "Demo Day");
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let (state, backend, _) = test_state().await;
        let identity = signed_in(&state, &backend, crate::backend::models::Role::Admin).await;
        let failure = update::<Events>(&state, &identity, Uuid::new_v4(), &demo_day())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_in_list() {
        let (state, backend, _) = test_state().await;
        let identity = signed_in(&state, &backend, crate::backend::models::Role::Admin).await;
        backend
            .insert(Table::Events, serde_json::json!({ "title": "broken" }), None)
            .await
            .unwrap();
        let listing = list::<Events>(&state, &identity).await;
        assert!(listing.items.is_empty());
        assert!(listing.notice.is_none());
    }
}
