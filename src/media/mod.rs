//! Media host seam.
//!
//! Images are stored by a third-party host; the site keeps only the
//! returned URL. [`MediaHost`] is what the upload gateway and the image
//! upload control talk to.

pub mod cloudinary;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::forms::UploadedFile;

/// Folder used when the caller names none.
pub const DEFAULT_FOLDER: &str = "bandipur";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media host is not configured")]
    NotConfigured,

    #[error("media host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("media host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected media host response: {0}")]
    Decode(String),
}

impl MediaError {
    pub fn user_message(&self) -> String {
        match self {
            MediaError::Rejected { message, .. } => message.clone(),
            MediaError::NotConfigured => "Media host is not configured".to_string(),
            MediaError::Http(_) | MediaError::Decode(_) => "Upload failed".to_string(),
        }
    }
}

/// A stored asset as reported by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store a `data:` URI inside `folder`.
    async fn upload(&self, data_uri: String, folder: &str) -> Result<UploadedAsset, MediaError>;

    /// Remove an asset. Returns the host's reply as is.
    async fn destroy(&self, public_id: &str) -> Result<serde_json::Value, MediaError>;

    fn is_configured(&self) -> bool;
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Upload a file received in a form.
pub async fn upload_file(
    host: &dyn MediaHost,
    file: &UploadedFile,
    folder: &str,
) -> Result<UploadedAsset, MediaError> {
    let asset = host
        .upload(data_uri(&file.content_type, &file.bytes), folder)
        .await?;
    tracing::info!(
        public_id = %asset.public_id,
        size = file.bytes.len(),
        folder,
        "media uploaded"
    );
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_encodes_payload() {
        assert_eq!(data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_rejected_error_surfaces_host_message() {
        let err = MediaError::Rejected {
            status: 400,
            message: "Invalid image file".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid image file");
        assert_eq!(MediaError::Decode("x".into()).user_message(), "Upload failed");
    }
}
