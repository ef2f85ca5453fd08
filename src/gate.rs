/**
 * Session/role gate
 * Every admin view starts in `Checking` and settles once into `Denied` or
 * `Authorized`. Denials redirect: no session goes to the login page, a
 * non-superadmin on a superadmin view goes back to the dashboard with a notice.
 */
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use cookie::Cookie;

use crate::error::ErrorResponse;
use crate::session::Identity;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "bh_session";
pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Query value of `notice` after a superadmin denial
pub const SUPERADMIN_REQUIRED: &str = "superadmin_required";
pub const SUPERADMIN_REQUIRED_MESSAGE: &str = "Access denied. Superadmin privileges required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Session,
    Superadmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoSession,
    NotSuperadmin,
}

impl Denial {
    pub fn redirect_target(&self) -> String {
        match self {
            Denial::NoSession => LOGIN_PATH.to_string(),
            Denial::NotSuperadmin => format!("{DASHBOARD_PATH}?notice={SUPERADMIN_REQUIRED}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GateState {
    Checking,
    Denied(Denial),
    Authorized(Identity),
}

impl GateState {
    /// Settle a `Checking` gate. A settled gate never moves again.
    pub fn settle(self, requirement: Requirement, identity: Option<Identity>) -> GateState {
        match self {
            GateState::Checking => decide(requirement, identity),
            settled => settled,
        }
    }
}

pub fn decide(requirement: Requirement, identity: Option<Identity>) -> GateState {
    match identity {
        None => GateState::Denied(Denial::NoSession),
        Some(identity) if requirement == Requirement::Superadmin && !identity.is_superadmin() => {
            GateState::Denied(Denial::NotSuperadmin)
        }
        Some(identity) => GateState::Authorized(identity),
    }
}

/// Session token from the `bh_session` cookie, else a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Identity behind the request, if any. Backend errors count as no session.
pub async fn current_identity(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let token = session_token(headers)?;
    match state.sessions.resolve(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed");
            None
        }
    }
}

pub async fn check(state: &AppState, headers: &HeaderMap, requirement: Requirement) -> GateState {
    let identity = current_identity(state, headers).await;
    GateState::Checking.settle(requirement, identity)
}

// ============================================================================
// Extractors
// ============================================================================

#[derive(Debug)]
pub enum GateRejection {
    Redirect(String),
    Unauthorized,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Redirect(target) => Redirect::to(&target).into_response(),
            GateRejection::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Authentication required")),
            )
                .into_response(),
        }
    }
}

async fn gate_parts<S>(parts: &Parts, state: &S, requirement: Requirement) -> GateState
where
    AppState: FromRef<S>,
{
    let app = AppState::from_ref(state);
    check(&app, &parts.headers, requirement).await
}

fn redirect_on_denial(gate: GateState) -> Result<Identity, GateRejection> {
    match gate {
        GateState::Authorized(identity) => Ok(identity),
        GateState::Denied(denial) => {
            tracing::debug!(?denial, "admin view denied");
            Err(GateRejection::Redirect(denial.redirect_target()))
        }
        GateState::Checking => Err(GateRejection::Redirect(LOGIN_PATH.to_string())),
    }
}

/// Any signed-in admin; redirects to the login page otherwise.
pub struct AdminSession(pub Identity);

/// Superadmins only.
pub struct SuperadminSession(pub Identity);

/// Any signed-in admin; answers `401` JSON instead of redirecting.
pub struct ApiSession(pub Identity);

impl<S> FromRequestParts<S> for AdminSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = gate_parts(parts, state, Requirement::Session).await;
        redirect_on_denial(gate).map(AdminSession)
    }
}

impl<S> FromRequestParts<S> for SuperadminSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = gate_parts(parts, state, Requirement::Superadmin).await;
        redirect_on_denial(gate).map(SuperadminSession)
    }
}

impl<S> FromRequestParts<S> for ApiSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match gate_parts(parts, state, Requirement::Session).await {
            GateState::Authorized(identity) => Ok(ApiSession(identity)),
            _ => Err(GateRejection::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "webops@bandipur.com".to_string(),
            full_name: None,
            role,
            access_token: "t".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_session_is_denied() {
        let gate = decide(Requirement::Session, None);
        assert!(matches!(gate, GateState::Denied(Denial::NoSession)));
        assert_eq!(Denial::NoSession.redirect_target(), "/admin/login");
    }

    #[test]
    fn test_admin_denied_on_superadmin_view() {
        let gate = decide(Requirement::Superadmin, Some(identity(Role::Admin)));
        assert!(matches!(gate, GateState::Denied(Denial::NotSuperadmin)));
        assert_eq!(
            Denial::NotSuperadmin.redirect_target(),
            "/admin/dashboard?notice=superadmin_required"
        );
    }

    #[test]
    fn test_roles_authorized_where_allowed() {
        assert!(matches!(
            decide(Requirement::Session, Some(identity(Role::Admin))),
            GateState::Authorized(_)
        ));
        assert!(matches!(
            decide(Requirement::Superadmin, Some(identity(Role::Superadmin))),
            GateState::Authorized(_)
        ));
    }

    #[test]
    fn test_settled_gate_does_not_move() {
        let denied = GateState::Denied(Denial::NoSession);
        let after = denied.settle(Requirement::Session, Some(identity(Role::Superadmin)));
        assert!(matches!(after, GateState::Denied(Denial::NoSession)));
    }

    #[test]
    fn test_session_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; bh_session=abc123".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer other".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        headers.remove(header::COOKIE);
        assert_eq!(session_token(&headers).as_deref(), Some("other"));

        assert!(session_token(&HeaderMap::new()).is_none());
    }
}
