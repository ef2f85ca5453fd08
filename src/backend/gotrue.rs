/**
 * GoTrue auth client
 * Password sign-in, sign-up, sign-out and reset mail against `/auth/v1`.
 * Access tokens are verified locally with the project's JWT secret.
 */
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::rest::check_status;
use super::{AuthApi, AuthSession, AuthUser, BackendError, BackendResult, SessionUser};
use crate::config::BackendConfig;

const AUDIENCE: &str = "authenticated";

/// Claims carried by a hosted-auth access token
#[derive(Debug, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub user_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Value,
}

pub struct GoTrueAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    jwt_secret: String,
}

impl GoTrueAuth {
    pub fn new(client: Client, base_url: &str, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Value,
        bearer: Option<&str>,
    ) -> BackendResult<reqwest::Response> {
        let mut request = self
            .client
            .post(self.url(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|source| BackendError::Http {
            context: format!("auth/{path}"),
            source,
        })?;
        check_status(response).await
    }
}

/// Verify an access token against `secret`.
pub fn verify_access_token(
    token: &str,
    secret: &str,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

fn full_name_from_metadata(metadata: Option<&Value>) -> Option<String> {
    metadata
        .and_then(|m| m.get("full_name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A GoTrue user object as an [`AuthUser`].
fn parse_user(user: &Value) -> BackendResult<AuthUser> {
    let id = user
        .get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| BackendError::Decode("auth user without id".to_string()))?;
    Ok(AuthUser {
        id,
        email: user
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        full_name: full_name_from_metadata(user.get("user_metadata")),
    })
}

#[async_trait]
impl AuthApi for GoTrueAuth {
    async fn get_session(&self, access_token: &str) -> BackendResult<Option<SessionUser>> {
        let claims = match verify_access_token(access_token, &self.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejected access token");
                return Ok(None);
            }
        };
        let Ok(id) = Uuid::parse_str(&claims.sub) else {
            return Ok(None);
        };
        let Some(expires_at) = DateTime::<Utc>::from_timestamp(claims.exp, 0) else {
            return Ok(None);
        };
        Ok(Some(SessionUser {
            user: AuthUser {
                id,
                email: claims.email.unwrap_or_default(),
                full_name: full_name_from_metadata(claims.user_metadata.as_ref()),
            },
            expires_at,
        }))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let response = match self
            .post(
                "token",
                &[("grant_type", "password")],
                json!({ "email": email, "password": password }),
                None,
            )
            .await
        {
            Ok(r) => r,
            Err(BackendError::Status { status: 400, .. }) => {
                return Err(BackendError::InvalidCredentials)
            }
            Err(e) => return Err(e),
        };

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let expires_at = token
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(token.expires_in.unwrap_or(3600)));

        Ok(AuthSession {
            user: parse_user(&token.user)?,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.post("logout", &[], json!({}), Some(access_token)).await?;
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> BackendResult<AuthUser> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        let response = self.post("signup", &[], body, None).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        // With email confirmation enabled the user comes back bare, otherwise
        // wrapped in a session.
        match value.get("user") {
            Some(user) if user.is_object() => parse_user(user),
            _ => parse_user(&value),
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> BackendResult<()> {
        let query: Vec<(&str, &str)> = redirect_to
            .map(|target| vec![("redirect_to", target)])
            .unwrap_or_default();
        self.post("recover", &query, json!({ "email": email }), None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: String,
        email: &'a str,
        aud: &'a str,
        exp: i64,
        user_metadata: Value,
    }

    fn issue(secret: &str, aud: &str, exp: i64) -> String {
        let claims = TestClaims {
            sub: Uuid::new_v4().to_string(),
            email: "secretary@bandipur.com",
            aud,
            exp,
            user_metadata: json!({ "full_name": "House Secretary" }),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_access_token_accepts_project_tokens() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let claims = verify_access_token(&issue("s3cret", AUDIENCE, exp), "s3cret").unwrap();
        assert_eq!(claims.email.as_deref(), Some("secretary@bandipur.com"));
        assert_eq!(
            full_name_from_metadata(claims.user_metadata.as_ref()).as_deref(),
            Some("House Secretary")
        );
    }

    #[test]
    fn test_verify_access_token_rejects_wrong_secret_and_audience() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        assert!(verify_access_token(&issue("other", AUDIENCE, exp), "s3cret").is_err());
        assert!(verify_access_token(&issue("s3cret", "anon", exp), "s3cret").is_err());
    }

    #[test]
    fn test_verify_access_token_rejects_expired() {
        let exp = (Utc::now() - Duration::hours(2)).timestamp();
        assert!(verify_access_token(&issue("s3cret", AUDIENCE, exp), "s3cret").is_err());
    }

    #[test]
    fn test_parse_user_reads_metadata_name() {
        let id = Uuid::new_v4();
        let user = json!({
            "id": id.to_string(),
            "email": "webops@bandipur.com",
            "user_metadata": { "full_name": "" }
        });
        let parsed = parse_user(&user).unwrap();
        assert_eq!(parsed.id, id);
        assert!(parsed.full_name.is_none());
        assert!(parse_user(&json!({ "email": "x@y.z" })).is_err());
    }
}
