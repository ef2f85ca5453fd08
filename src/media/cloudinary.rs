/**
 * Cloudinary client
 * Signed upload and destroy calls against the Cloudinary REST API
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{MediaError, MediaHost, UploadedAsset};
use crate::config::MediaConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const UNSIGNED_PARAMS: &[&str] = &["file", "api_key", "resource_type", "cloud_name"];

#[derive(Debug, Deserialize)]
struct UploadReply {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

pub struct CloudinaryHost {
    client: Client,
    config: MediaConfig,
    api_base: String,
}

impl CloudinaryHost {
    pub fn new(client: Client, config: MediaConfig) -> Self {
        Self {
            client,
            config,
            api_base: API_BASE.to_string(),
        }
    }

    fn cloud_name(&self) -> Result<&str, MediaError> {
        match self.config.cloud_name.as_deref() {
            Some(name) if self.config.is_configured() => Ok(name),
            _ => Err(MediaError::NotConfigured),
        }
    }

    /// Sign `params`, add the credentials and post them as a form.
    async fn signed_post(
        &self,
        endpoint: &str,
        mut params: BTreeMap<&'static str, String>,
    ) -> Result<Value, MediaError> {
        let cloud = self.cloud_name()?;
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("api_key", self.config.api_key.clone());
        params.insert("signature", signature);
        params.insert("signature_algorithm", "sha256".to_string());

        let response = self
            .client
            .post(format!("{}/{}/{}", self.api_base, cloud, endpoint))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }
        Ok(body)
    }
}

/// SHA-256 over the sorted `key=value` pairs joined by `&`, secret appended.
pub fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|&(key, value)| !UNSIGNED_PARAMS.contains(key) && !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, data_uri: String, folder: &str) -> Result<UploadedAsset, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("file", data_uri);
        params.insert("folder", folder.to_string());

        // resource_type=auto is selected by the endpoint path
        let body = self.signed_post("auto/upload", params).await?;
        let reply: UploadReply =
            serde_json::from_value(body).map_err(|e| MediaError::Decode(e.to_string()))?;
        Ok(UploadedAsset {
            url: reply.secure_url,
            public_id: reply.public_id,
            width: reply.width,
            height: reply.height,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<Value, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let body = self.signed_post("image/destroy", params).await?;
        tracing::info!(public_id, "media destroyed");
        Ok(body)
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params_and_skips_file() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("folder", "bandipur".to_string());
        params.insert("file", "data:image/png;base64,AAAA".to_string());

        let mut expected = Sha256::new();
        expected.update(b"folder=bandipur&timestamp=1315060510");
        expected.update(b"secret");
        assert_eq!(sign(&params, "secret"), format!("{:x}", expected.finalize()));
    }

    #[test]
    fn test_error_message_reads_nested_error() {
        let body = serde_json::json!({ "error": { "message": "Invalid Signature" } });
        assert_eq!(error_message(&body).as_deref(), Some("Invalid Signature"));
        assert!(error_message(&serde_json::json!({})).is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_host_fails_without_network() {
        let host = CloudinaryHost::new(Client::new(), MediaConfig::default());
        assert!(!host.is_configured());
        let err = host
            .upload("data:image/png;base64,AAAA".to_string(), "bandipur")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotConfigured));
    }
}
