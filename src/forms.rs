/**
 * Form collection
 * Turns a multipart admin form into text fields and file parts
 */
use std::collections::HashMap;

use axum::{body::Bytes, extract::Multipart};

use crate::error::AppError;

/// A file part of a form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Read every part. A part with a filename is a file; an empty file
    /// input arrives as a zero-length part and counts as no selection.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.insert(
                    name,
                    UploadedFile {
                        file_name: Some(file_name).filter(|n| !n.is_empty()),
                        content_type,
                        bytes,
                    },
                );
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed value, `None` when missing or blank.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required(&self, name: &str, label: &str) -> Result<String, String> {
        self.non_empty(name)
            .ok_or_else(|| format!("{label} is required"))
    }

    /// Checkbox-style flag.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.text(name).map(str::trim), Some("true" | "on" | "1"))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        if !bytes.is_empty() {
            self.files.insert(
                name.to_string(),
                UploadedFile {
                    file_name: Some(format!("{name}.bin")),
                    content_type: content_type.to_string(),
                    bytes: Bytes::from(bytes),
                },
            );
        }
        self
    }
}
