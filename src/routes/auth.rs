/**
 * Authentication Routes
 * Password sign-in, sign-out, reset mail and session lookup, all delegated
 * to the hosted auth service. The session travels in an HttpOnly cookie.
 */
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::gate::{self, ApiSession, DASHBOARD_PATH, SESSION_COOKIE};
use crate::session::Identity;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    fn failed(error: &str) -> Json<Self> {
        Json(Self {
            success: false,
            user: None,
            redirect: None,
            error: Some(error.to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub title: &'static str,
    pub description: &'static str,
    pub login_action: &'static str,
    pub reset_action: &'static str,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SimpleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Identity,
}

// ============================================================================
// Cookies
// ============================================================================

pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let expires = cookie::time::OffsetDateTime::from_unix_timestamp(expires_at.timestamp())
        .unwrap_or_else(|_| cookie::time::OffsetDateTime::now_utc());
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .expires(expires)
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

pub fn clear_session_cookie(secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .expires(cookie::time::OffsetDateTime::UNIX_EPOCH)
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /admin/login
/// Signed-in admins are sent straight to the dashboard
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if gate::current_identity(&state, &headers).await.is_some() {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    Json(LoginPage {
        title: "Admin Access",
        description: "Enter your credentials to continue",
        login_action: "/api/auth/login",
        reset_action: "/api/auth/reset-password",
    })
    .into_response()
}

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> Response {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            LoginResponse::failed("Email and password are required"),
        )
            .into_response();
    }

    let session = match state.auth.sign_in_with_password(&email, &payload.password).await {
        Ok(session) => session,
        Err(BackendError::InvalidCredentials) => {
            tracing::warn!(email = %email, "failed login attempt");
            return (StatusCode::UNAUTHORIZED, LoginResponse::failed("Invalid credentials"))
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "sign-in request failed");
            return (StatusCode::BAD_GATEWAY, LoginResponse::failed(&e.user_message()))
                .into_response();
        }
    };

    // first login creates the profile
    let identity = match state.sessions.resolve(&session.access_token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            tracing::error!(user_id = %session.user.id, "issued session did not verify");
            return (
                StatusCode::BAD_GATEWAY,
                LoginResponse::failed("Session could not be verified"),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "session lookup after sign-in failed");
            return (StatusCode::BAD_GATEWAY, LoginResponse::failed(&e.user_message()))
                .into_response();
        }
    };

    tracing::info!(user_id = %identity.user_id, role = identity.role.as_str(), "admin signed in");
    let cookie = session_cookie(
        &session.access_token,
        session.expires_at,
        state.config.cookie_secure,
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            user: Some(identity),
            redirect: Some(DASHBOARD_PATH.to_string()),
            error: None,
        }),
    )
        .into_response()
}

/// POST /api/auth/logout
/// Always succeeds; the cookie is cleared even if the auth service is unreachable
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = gate::session_token(&headers) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "sign-out request failed");
        }
        state.sessions.invalidate(&token).await;
        tracing::info!("admin signed out");
    }

    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.cookie_secure),
        )],
        Json(SimpleResponse {
            success: true,
            message: None,
        }),
    )
}

/// POST /api/auth/reset-password
/// Same answer whether or not the address has an account
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SimpleResponse {
                success: false,
                message: Some("Email is required".to_string()),
            }),
        );
    }

    if let Err(e) = state
        .auth
        .reset_password_for_email(&email, state.config.password_reset_redirect.as_deref())
        .await
    {
        tracing::error!(error = %e, "password reset dispatch failed");
    }

    (
        StatusCode::OK,
        Json(SimpleResponse {
            success: true,
            message: Some(
                "If an account exists for that address, a reset link has been sent.".to_string(),
            ),
        }),
    )
}

/// GET /api/auth/session
pub async fn current_session(ApiSession(identity): ApiSession) -> impl IntoResponse {
    Json(SessionResponse {
        authenticated: true,
        user: identity,
    })
}
