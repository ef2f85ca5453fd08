/**
 * Admins manager
 * Superadmin-only management of admin profiles. Creating an admin signs the
 * account up with the auth service first; the profile row follows and is not
 * rolled back into the sign-up if it fails.
 */
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{list, Card, Collection, Listing};
use crate::backend::models::{Profile, Role};
use crate::backend::{OrderBy, Table};
use crate::error::AppError;
use crate::session::Identity;
use crate::state::AppState;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const CREATED: &str = "Admin created successfully. They may need to confirm their email.";
pub const CREATE_FAILED: &str = "Failed to create admin";
pub const ROLE_UPDATED: &str = "Role updated";
pub const ROLE_UPDATE_FAILED: &str = "Failed to update role";

pub struct Admins;

impl Collection for Admins {
    type Row = Profile;

    const TABLE: Table = Table::Profiles;
    const ORDER: OrderBy = OrderBy::desc("created_at");
    const NOUN: &'static str = "Admin";
    const LABEL: &'static str = "admins";
    const DELETED: &'static str = "Admin profile removed";
    const DELETE_FAILED: &'static str = "Failed to delete admin profile";
    const CONFIRM_PROMPT: &'static str = "Are you sure you want to remove this admin? \
        This will NOT delete their auth account, only their admin profile.";

    fn id(row: &Profile) -> Uuid {
        row.id
    }

    fn card(row: &Profile) -> Card {
        Card {
            id: row.id,
            title: row.full_name.clone().unwrap_or_else(|| row.email.clone()),
            subtitle: Some(row.email.clone()),
            tag: Some(row.role.as_str().to_string()),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Admin
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    request: NewAdmin,
) -> Result<Listing, AppError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email format".to_string()));
    }
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user = state
        .auth
        .sign_up(&email, &request.password, full_name)
        .await?;
    tracing::info!(user_id = %user.id, role = request.role.as_str(), "admin account signed up");

    let token = Some(identity.access_token.as_str());
    let profile = json!({
        "id": user.id,
        "email": email,
        "full_name": full_name,
        "role": request.role.as_str(),
    });
    if let Err(e) = state.tables.insert(Table::Profiles, profile, token).await {
        // a profile may already exist from a sign-up trigger
        tracing::warn!(user_id = %user.id, error = %e, "profile insert failed, updating instead");
        let patch = json!({ "role": request.role.as_str(), "full_name": full_name });
        if let Err(e) = state
            .tables
            .update(Table::Profiles, &user.id.to_string(), patch, token)
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "profile update after sign-up failed");
        }
    }

    Ok(list::<Admins>(state, identity).await)
}

pub async fn update_role(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    role: Role,
) -> Result<Listing, AppError> {
    let updated = state
        .tables
        .update(
            Table::Profiles,
            &id.to_string(),
            json!({ "role": role.as_str() }),
            Some(&identity.access_token),
        )
        .await
        .map_err(|e| {
            tracing::error!(%id, error = %e, "{}", ROLE_UPDATE_FAILED);
            AppError::from(e)
        })?;
    if updated.is_empty() {
        return Err(AppError::NotFound(Admins::NOUN.to_string()));
    }

    state.sessions.invalidate_user(id).await;
    tracing::info!(%id, role = role.as_str(), "admin role updated");
    Ok(list::<Admins>(state, identity).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthApi;
    use crate::test_support::{signed_in, test_state};

    fn new_admin(email: &str, password: &str) -> NewAdmin {
        NewAdmin {
            email: email.to_string(),
            password: password.to_string(),
            full_name: Some("Web Ops".to_string()),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("webops@bandipur.com"));
        assert!(!is_valid_email("webops"));
        assert!(!is_valid_email("web ops@bandipur.com"));
    }

    #[tokio::test]
    async fn test_create_signs_up_and_lists_profile() {
        let (state, backend, _) = test_state().await;
        let superadmin = signed_in(&state, &backend, Role::Superadmin).await;

        let listing = create(&state, &superadmin, new_admin(" WebOps@Bandipur.com ", "pw123456"))
            .await
            .unwrap();
        assert!(listing
            .items
            .iter()
            .any(|c| c.subtitle.as_deref() == Some("webops@bandipur.com")));
        assert!(backend
            .sign_in_with_password("webops@bandipur.com", "pw123456")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_create_requires_email_and_password() {
        let (state, backend, _) = test_state().await;
        let superadmin = signed_in(&state, &backend, Role::Superadmin).await;
        let err = create(&state, &superadmin, new_admin("", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required");
    }

    #[tokio::test]
    async fn test_profile_insert_failure_keeps_account() {
        let (state, backend, _) = test_state().await;
        let superadmin = signed_in(&state, &backend, Role::Superadmin).await;
        backend.fail_writes(Table::Profiles, true).await;

        assert!(create(&state, &superadmin, new_admin("late@bandipur.com", "pw123456"))
            .await
            .is_ok());
        // no rollback of the auth account
        assert!(backend
            .sign_in_with_password("late@bandipur.com", "pw123456")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_role_refreshes_cached_identity() {
        let (state, backend, _) = test_state().await;
        let superadmin = signed_in(&state, &backend, Role::Superadmin).await;
        let admin = signed_in(&state, &backend, Role::Admin).await;

        update_role(&state, &superadmin, admin.user_id, Role::Superadmin)
            .await
            .unwrap();
        let reloaded = state
            .sessions
            .resolve(&admin.access_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.role, Role::Superadmin);
    }
}
