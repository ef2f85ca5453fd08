//! Fixtures shared by the unit and router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::backend::memory::MemoryBackend;
use crate::backend::models::Role;
use crate::backend::{AuthApi, Table, TableApi};
use crate::config::AppConfig;
use crate::media::{MediaError, MediaHost, UploadedAsset};
use crate::session::Identity;
use crate::state::AppState;

pub const TEST_PASSWORD: &str = "password123";

/// Media host that records calls instead of uploading
#[derive(Default)]
pub struct RecordingMedia {
    uploads: AtomicUsize,
    destroys: AtomicUsize,
    fail_with: Option<String>,
}

impl RecordingMedia {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    fn rejection(&self) -> Option<MediaError> {
        self.fail_with.as_ref().map(|message| MediaError::Rejected {
            status: 400,
            message: message.clone(),
        })
    }
}

#[async_trait]
impl MediaHost for RecordingMedia {
    async fn upload(&self, data_uri: String, folder: &str) -> Result<UploadedAsset, MediaError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = self.rejection() {
            return Err(err);
        }
        assert!(data_uri.starts_with("data:"), "upload must send a data URI");
        Ok(UploadedAsset {
            url: format!("https://res.cloudinary.test/{folder}/asset-{n}.png"),
            public_id: format!("{folder}/asset-{n}"),
            width: Some(800),
            height: Some(600),
        })
    }

    async fn destroy(&self, _public_id: &str) -> Result<Value, MediaError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        match self.rejection() {
            Some(err) => Err(err),
            None => Ok(json!({ "result": "ok" })),
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub async fn test_state() -> (AppState, Arc<MemoryBackend>, Arc<RecordingMedia>) {
    test_state_with_media(RecordingMedia::default()).await
}

pub async fn test_state_with_media(
    media: RecordingMedia,
) -> (AppState, Arc<MemoryBackend>, Arc<RecordingMedia>) {
    let backend = Arc::new(MemoryBackend::new());
    let media = Arc::new(media);
    let state = AppState::new(
        AppConfig::default(),
        backend.clone(),
        backend.clone(),
        media.clone(),
    );
    (state, backend, media)
}

/// Sign a fresh account in with a stored profile of `role`.
pub async fn signed_in(state: &AppState, backend: &MemoryBackend, role: Role) -> Identity {
    let email = format!("admin-{}@bandipur.com", Uuid::new_v4().simple());
    let user_id = backend.add_user(&email, TEST_PASSWORD, None).await;
    backend
        .insert(
            Table::Profiles,
            json!({ "id": user_id, "email": email, "role": role.as_str() }),
            None,
        )
        .await
        .unwrap();
    let session = backend
        .sign_in_with_password(&email, TEST_PASSWORD)
        .await
        .unwrap();
    state
        .sessions
        .resolve(&session.access_token)
        .await
        .unwrap()
        .unwrap()
}

pub fn session_cookie(identity: &Identity) -> String {
    format!("bh_session={}", identity.access_token)
}

// ============================================================================
// Requests
// ============================================================================

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

pub enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl Part {
    pub fn text(name: &str, value: &str) -> Self {
        Part::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn file(name: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Part::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

const BOUNDARY: &str = "bandipur-test-boundary";

/// `(content-type header, body)` for a multipart form.
pub fn multipart_body(parts: &[Part]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn multipart_request(method: &str, uri: &str, cookie: Option<&str>, parts: &[Part]) -> Request<Body> {
    let (content_type, body) = multipart_body(parts);
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body)).unwrap()
}
