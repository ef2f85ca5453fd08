//! Hosted backend access.
//!
//! The site owns no tables. Everything goes through two seams:
//! [`TableApi`] (generic row operations against named tables) and
//! [`AuthApi`] (sessions and accounts). Production talks to Supabase's
//! PostgREST and GoTrue services; [`memory::MemoryBackend`] backs tests and
//! local runs without a hosted project.

pub mod gotrue;
pub mod memory;
pub mod models;
pub mod rest;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row as the table API returns it (JSON object).
pub type Row = serde_json::Value;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("backend request to {context} failed: {source}")]
    Http {
        context: String,
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Message safe to surface to an admin in a notification.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status { message, .. } => message.clone(),
            BackendError::InvalidCredentials => "Invalid login credentials".to_string(),
            BackendError::Http { .. } => "Backend is unreachable".to_string(),
            BackendError::Decode(_) => "Unexpected backend response".to_string(),
        }
    }
}

// ============================================================================
// Table API
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Events,
    Clubs,
    TeamMembers,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Events => "events",
            Table::Clubs => "clubs",
            Table::TeamMembers => "team_members",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// A select against one table: equality filters, one ordering, optional limit.
#[derive(Debug, Clone, Default)]
pub struct Select {
    pub columns: Option<&'static str>,
    pub filters: Vec<(String, String)>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &'static str) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Generic row operations against the hosted store.
///
/// `token` is the caller's access token. When absent the request runs with
/// the project's anonymous key, so the backend's row policies decide what the
/// caller may see or change.
#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, table: Table, query: &Select, token: Option<&str>)
        -> BackendResult<Vec<Row>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: Table, row: Row, token: Option<&str>) -> BackendResult<Row>;

    /// Update the row with `id`, returning the updated rows (empty when none matched).
    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        token: Option<&str>,
    ) -> BackendResult<Vec<Row>>;

    async fn delete(&self, table: Table, id: &str, token: Option<&str>) -> BackendResult<()>;

    async fn count(&self, table: Table, token: Option<&str>) -> BackendResult<u64>;

    /// Round-trip to the backend, used by health checks.
    async fn ping(&self) -> BackendResult<Duration>;
}

// ============================================================================
// Auth API
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// An active session as seen from its access token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Resolve an access token to its session, `None` when it is not active.
    async fn get_session(&self, access_token: &str) -> BackendResult<Option<SessionUser>>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> BackendResult<AuthUser>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_builder_collects_filters() {
        let query = Select::all()
            .columns("title, status")
            .eq("status", "Upcoming")
            .order(OrderBy::asc("event_date"))
            .limit(5);
        assert_eq!(query.filters, vec![("status".to_string(), "Upcoming".to_string())]);
        assert_eq!(query.order, Some(OrderBy::asc("event_date")));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.columns, Some("title, status"));
    }

    #[test]
    fn test_table_names_match_backend_schema() {
        assert_eq!(Table::Profiles.name(), "profiles");
        assert_eq!(Table::TeamMembers.to_string(), "team_members");
    }

    #[test]
    fn test_status_error_surfaces_upstream_message() {
        let err = BackendError::Status {
            status: 409,
            message: "duplicate key value".to_string(),
        };
        assert_eq!(err.user_message(), "duplicate key value");
    }
}
