/**
 * Image upload control
 * Resolves an image field of an admin form to a change of its stored URL:
 * a file sent to the media host, a pasted URL, or a removal.
 */
use reqwest::Url;

use crate::error::AppError;
use crate::forms::{FormData, UploadedFile};
use crate::media::{self, MediaError, MediaHost};

/// Largest accepted upload (5 MB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    Upload,
    Url,
}

impl ImageMode {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("url") => ImageMode::Url,
            _ => ImageMode::Upload,
        }
    }
}

/// Outcome for the field's stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Unchanged,
    Set(String),
    Cleared,
}

impl ImageChange {
    pub fn apply(self, target: &mut Option<String>) {
        match self {
            ImageChange::Unchanged => {}
            ImageChange::Set(url) => *target = Some(url),
            ImageChange::Cleared => *target = None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Please select an image file")]
    NotAnImage,

    #[error("File size must be less than 5MB")]
    TooLarge,

    #[error("Please enter a valid URL")]
    InvalidUrl,

    #[error("Failed to upload image")]
    Upload(#[from] MediaError),
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Upload(media) => AppError::Media(media),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// The form fields one image input posts.
#[derive(Debug, Clone, Copy)]
pub struct ImageField<'a> {
    pub name: &'a str,
    pub folder: &'a str,
}

impl ImageField<'_> {
    fn part(&self, suffix: &str) -> String {
        format!("{}_{}", self.name, suffix)
    }
}

/// Type and size checks, run before anything is sent.
pub fn validate_file(file: &UploadedFile) -> Result<(), ImageError> {
    if !file.content_type.starts_with("image/") {
        return Err(ImageError::NotAnImage);
    }
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge);
    }
    Ok(())
}

/// Accept `raw` when it parses as an absolute URL. The input is returned
/// unchanged, not normalised.
pub fn validate_url(raw: &str) -> Result<String, ImageError> {
    match Url::parse(raw.trim()) {
        Ok(_) => Ok(raw.to_string()),
        Err(_) => Err(ImageError::InvalidUrl),
    }
}

pub async fn resolve(
    form: &FormData,
    field: ImageField<'_>,
    host: &dyn MediaHost,
) -> Result<ImageChange, ImageError> {
    if form.flag(&field.part("remove")) {
        return Ok(ImageChange::Cleared);
    }

    match ImageMode::parse(form.text(&field.part("mode"))) {
        ImageMode::Upload => {
            let Some(file) = form.file(&field.part("file")) else {
                return Ok(ImageChange::Unchanged);
            };
            validate_file(file)?;
            let asset = media::upload_file(host, file, field.folder).await?;
            Ok(ImageChange::Set(asset.url))
        }
        ImageMode::Url => match form.text(&field.part("url")) {
            Some(raw) if !raw.trim().is_empty() => Ok(ImageChange::Set(validate_url(raw)?)),
            _ => Ok(ImageChange::Unchanged),
        },
    }
}

/// Value the caller already holds, as posted back in `<f>`.
pub fn current_value(form: &FormData, field: ImageField<'_>) -> Option<String> {
    form.non_empty(field.name)
}
