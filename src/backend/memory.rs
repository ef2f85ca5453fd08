//! In-process backend.
//!
//! Implements both [`TableApi`] and [`AuthApi`] over maps guarded by tokio
//! locks. Used when no hosted project is configured and by the test suite.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuthApi, AuthSession, AuthUser, BackendError, BackendResult, Row, Select, SessionUser, Table,
    TableApi,
};

const SESSION_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
struct MemoryUser {
    user: AuthUser,
    password: String,
}

impl MemoryUser {
    fn new(email: &str, password: &str, full_name: Option<&str>) -> Self {
        Self {
            user: AuthUser {
                id: Uuid::new_v4(),
                email: email.to_lowercase(),
                full_name: full_name.map(str::to_string),
            },
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct MemorySession {
    user_id: Uuid,
    expires_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    users: RwLock<HashMap<String, MemoryUser>>,
    sessions: RwLock<HashMap<String, MemorySession>>,
    reset_requests: RwLock<Vec<String>>,
    failing: RwLock<HashSet<Table>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account directly, returning its id.
    pub async fn add_user(&self, email: &str, password: &str, full_name: Option<&str>) -> Uuid {
        let account = MemoryUser::new(email, password, full_name);
        let id = account.user.id;
        self.users
            .write()
            .await
            .insert(account.user.email.clone(), account);
        id
    }

    /// Make every write to `table` fail until cleared.
    pub async fn fail_writes(&self, table: Table, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(table);
        } else {
            set.remove(&table);
        }
    }

    /// Addresses that asked for a password reset, oldest first.
    pub async fn reset_requests(&self) -> Vec<String> {
        self.reset_requests.read().await.clone()
    }

    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    async fn check_writable(&self, table: Table) -> BackendResult<()> {
        if self.failing.read().await.contains(&table) {
            return Err(BackendError::Status {
                status: 503,
                message: format!("{table} is unavailable"),
            });
        }
        Ok(())
    }
}

fn value_matches(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        Some(Value::Null) | None => expected == "null",
        Some(_) => false,
    }
}

/// Nulls sort last, as PostgreSQL does for ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn project(row: &Row, columns: Option<&str>) -> Row {
    let Some(columns) = columns else {
        return row.clone();
    };
    let mut out = serde_json::Map::new();
    for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if column == "*" {
            return row.clone();
        }
        out.insert(
            column.to_string(),
            row.get(column).cloned().unwrap_or(Value::Null),
        );
    }
    Value::Object(out)
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(|v| v.as_str())
}

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(
        &self,
        table: Table,
        query: &Select,
        _token: Option<&str>,
    ) -> BackendResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|(column, value)| value_matches(row.get(column), value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(order.column), b.get(order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.iter().map(|row| project(row, query.columns)).collect())
    }

    async fn insert(&self, table: Table, row: Row, _token: Option<&str>) -> BackendResult<Row> {
        self.check_writable(table).await?;
        let Value::Object(mut fields) = row else {
            return Err(BackendError::Status {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };

        match fields.get("id") {
            Some(Value::String(_)) => {}
            _ => {
                fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        fields
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        let id = fields.get("id").and_then(|v| v.as_str()).unwrap_or_default();
        if rows.iter().any(|existing| row_id(existing) == Some(id)) {
            return Err(BackendError::Status {
                status: 409,
                message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
            });
        }
        let stored = Value::Object(fields);
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        _token: Option<&str>,
    ) -> BackendResult<Vec<Row>> {
        self.check_writable(table).await?;
        let Value::Object(patch) = patch else {
            return Err(BackendError::Status {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for row in tables.entry(table).or_default().iter_mut() {
            if row_id(row) != Some(id) {
                continue;
            }
            if let Value::Object(fields) = row {
                for (key, value) in &patch {
                    if key != "id" {
                        fields.insert(key.clone(), value.clone());
                    }
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, id: &str, _token: Option<&str>) -> BackendResult<()> {
        self.check_writable(table).await?;
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|row| row_id(row) != Some(id));
        }
        Ok(())
    }

    async fn count(&self, table: Table, _token: Option<&str>) -> BackendResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table).map(|rows| rows.len() as u64).unwrap_or(0))
    }

    async fn ping(&self) -> BackendResult<Duration> {
        Ok(Duration::ZERO)
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn get_session(&self, access_token: &str) -> BackendResult<Option<SessionUser>> {
        let session = match self.sessions.read().await.get(access_token) {
            Some(s) if s.expires_at > Utc::now() => s.clone(),
            _ => return Ok(None),
        };
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.user.id == session.user_id)
            .map(|u| SessionUser {
                user: u.user.clone(),
                expires_at: session.expires_at,
            }))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let user = match self.users.read().await.get(&email.to_lowercase()) {
            Some(u) if u.password == password => u.user.clone(),
            _ => return Err(BackendError::InvalidCredentials),
        };
        let access_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + ChronoDuration::minutes(SESSION_LIFETIME_MINUTES);
        self.sessions.write().await.insert(
            access_token.clone(),
            MemorySession {
                user_id: user.id,
                expires_at,
            },
        );
        Ok(AuthSession {
            access_token,
            refresh_token: None,
            expires_at,
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> BackendResult<AuthUser> {
        // check and insert under one guard
        let mut users = self.users.write().await;
        let key = email.to_lowercase();
        if users.contains_key(&key) {
            return Err(BackendError::Status {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let account = MemoryUser::new(email, password, full_name);
        let user = account.user.clone();
        users.insert(key, account);
        Ok(user)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        _redirect_to: Option<&str>,
    ) -> BackendResult<()> {
        self.reset_requests.write().await.push(email.to_string());
        Ok(())
    }
}
