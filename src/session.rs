/**
 * Session context
 * One process-wide view of who a session token belongs to. Tokens resolve
 * to an Identity (auth user plus stored profile role) once and are cached
 * until the session expires, the holder signs out, or their role changes.
 */
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::models::{parse_rows, Profile, Role};
use crate::backend::{AuthApi, AuthUser, BackendResult, Select, Table, TableApi};

/// How long a signed-out token stays refused when its expiry is unknown.
const REVOKED_HOLD_HOURS: i64 = 24;

/// A signed-in admin
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(skip)]
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    /// Name for greetings, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

pub struct SessionContext {
    tables: Arc<dyn TableApi>,
    auth: Arc<dyn AuthApi>,
    identities: RwLock<HashMap<String, Identity>>,
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionContext {
    pub fn new(tables: Arc<dyn TableApi>, auth: Arc<dyn AuthApi>) -> Self {
        Self {
            tables,
            auth,
            identities: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    /// Identity for `token`, `None` when there is no active session.
    pub async fn resolve(&self, token: &str) -> BackendResult<Option<Identity>> {
        if self.revoked.read().await.contains_key(token) {
            return Ok(None);
        }

        let now = Utc::now();
        if let Some(identity) = self.identities.read().await.get(token) {
            if identity.expires_at > now {
                return Ok(Some(identity.clone()));
            }
        }

        let Some(session) = self.auth.get_session(token).await? else {
            self.identities.write().await.remove(token);
            return Ok(None);
        };

        let (profile, cacheable) = match self.load_profile(&session.user, token).await {
            Ok(profile) => {
                let stored = profile.is_some();
                (profile, stored)
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user.id, error = %e, "profile lookup failed");
                (None, false)
            }
        };

        let identity = Identity {
            user_id: session.user.id,
            email: profile
                .as_ref()
                .map(|p| p.email.clone())
                .unwrap_or_else(|| session.user.email.clone()),
            full_name: profile
                .as_ref()
                .and_then(|p| p.full_name.clone())
                .or_else(|| session.user.full_name.clone()),
            role: profile.map(|p| p.role).unwrap_or(Role::Admin),
            access_token: token.to_string(),
            expires_at: session.expires_at,
        };

        if cacheable {
            let mut identities = self.identities.write().await;
            identities.retain(|_, cached| cached.expires_at > now);
            identities.insert(token.to_string(), identity.clone());
        }
        Ok(Some(identity))
    }

    /// Stored profile, creating a default `admin` one on first sight.
    /// `Ok(None)` means the profile could not be created.
    async fn load_profile(&self, user: &AuthUser, token: &str) -> BackendResult<Option<Profile>> {
        let rows = self
            .tables
            .select(
                Table::Profiles,
                &Select::all().eq("id", user.id.to_string()).limit(1),
                Some(token),
            )
            .await?;
        if let Some(profile) = parse_rows::<Profile>(Table::Profiles, rows).into_iter().next() {
            return Ok(Some(profile));
        }

        let row = json!({
            "id": user.id,
            "email": user.email,
            "role": Role::Admin.as_str(),
            "full_name": user.full_name,
        });
        match self.tables.insert(Table::Profiles, row, Some(token)).await {
            Ok(stored) => {
                tracing::info!(user_id = %user.id, "created default admin profile");
                Ok(serde_json::from_value(stored).ok())
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "failed to create profile");
                Ok(None)
            }
        }
    }

    /// Forget `token` and refuse it from now on.
    pub async fn invalidate(&self, token: &str) {
        let expires_at = self
            .identities
            .write()
            .await
            .remove(token)
            .map(|identity| identity.expires_at)
            .unwrap_or_else(|| Utc::now() + Duration::hours(REVOKED_HOLD_HOURS));

        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        revoked.insert(token.to_string(), expires_at);
    }

    /// Drop cached identities of `user_id` so the next request reloads the profile.
    pub async fn invalidate_user(&self, user_id: Uuid) {
        self.identities
            .write()
            .await
            .retain(|_, identity| identity.user_id != user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    async fn context() -> (Arc<MemoryBackend>, SessionContext, String) {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .add_user("secretary@bandipur.com", "hunter22", Some("House Secretary"))
            .await;
        let session = backend
            .sign_in_with_password("secretary@bandipur.com", "hunter22")
            .await
            .unwrap();
        let ctx = SessionContext::new(backend.clone(), backend.clone());
        (backend, ctx, session.access_token)
    }

    #[tokio::test]
    async fn test_first_sight_creates_admin_profile() {
        let (backend, ctx, token) = context().await;
        let identity = ctx.resolve(&token).await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.display_name(), "House Secretary");

        let profiles = backend.rows(Table::Profiles).await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["role"], "admin");
    }

    #[tokio::test]
    async fn test_profile_insert_failure_still_grants_admin() {
        let (backend, ctx, token) = context().await;
        backend.fail_writes(Table::Profiles, true).await;
        let identity = ctx.resolve(&token).await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert!(backend.rows(Table::Profiles).await.is_empty());
    }

    #[tokio::test]
    async fn test_caching_drops_expired_identities() {
        let (_, ctx, token) = context().await;
        let stale = Identity {
            user_id: Uuid::new_v4(),
            email: "former@bandipur.com".to_string(),
            full_name: None,
            role: Role::Admin,
            access_token: "ended-session".to_string(),
            expires_at: Utc::now() - Duration::minutes(5),
        };
        ctx.identities
            .write()
            .await
            .insert("ended-session".to_string(), stale);

        assert!(ctx.resolve(&token).await.unwrap().is_some());
        let identities = ctx.identities.read().await;
        assert!(!identities.contains_key("ended-session"));
        assert!(identities.contains_key(&token));
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_identity() {
        let (_, ctx, _) = context().await;
        assert!(ctx.resolve("not-a-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_refuses_token_even_if_session_lives() {
        let (_, ctx, token) = context().await;
        assert!(ctx.resolve(&token).await.unwrap().is_some());
        ctx.invalidate(&token).await;
        assert!(ctx.resolve(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_user_reloads_role() {
        let (backend, ctx, token) = context().await;
        let identity = ctx.resolve(&token).await.unwrap().unwrap();
        backend
            .update(
                Table::Profiles,
                &identity.user_id.to_string(),
                json!({ "role": "superadmin" }),
                None,
            )
            .await
            .unwrap();

        // cached until invalidated
        assert_eq!(ctx.resolve(&token).await.unwrap().unwrap().role, Role::Admin);
        ctx.invalidate_user(identity.user_id).await;
        assert_eq!(
            ctx.resolve(&token).await.unwrap().unwrap().role,
            Role::Superadmin
        );
    }
}
