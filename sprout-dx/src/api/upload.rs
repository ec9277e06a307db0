//! Multipart upload parsing and validation
//!
//! Every check here runs before any backend is called.

use crate::error::{ApiError, ApiResult};
use crate::types::ImageBytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Accepted image extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".bmp", ".webp"];

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Parsed multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file: Option<Vec<u8>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read all parts; the file part is capped at `max_bytes`
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == FILE_FIELD {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
                form.file = Some(bytes.to_vec());
            } else {
                let value = field.text().await.map_err(|e| multipart_error(e, max_bytes))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Non-blank text field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Image checked against the extension allow-list and size cap
    pub fn image(&self, max_bytes: usize) -> ApiResult<ImageBytes> {
        let file_name = self.file_name.as_deref().unwrap_or_default();
        validate_extension(file_name)?;
        self.checked_bytes(max_bytes)
    }

    /// Image checked for image content (content type or extension) and size cap
    pub fn image_content(&self, max_bytes: usize) -> ApiResult<ImageBytes> {
        let declared_image = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("image/"));
        let allowed_name = self
            .file_name
            .as_deref()
            .is_some_and(|n| validate_extension(n).is_ok());

        if !declared_image && !allowed_name {
            return Err(ApiError::BadRequest("Only image files can be uploaded".to_string()));
        }
        self.checked_bytes(max_bytes)
    }

    fn checked_bytes(&self, max_bytes: usize) -> ApiResult<ImageBytes> {
        let bytes = self
            .file
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", FILE_FIELD)))?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        Ok(Arc::from(bytes))
    }
}

/// Reject files whose extension is not an accepted image type
pub fn validate_extension(file_name: &str) -> ApiResult<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()));

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ApiError::BadRequest(format!(
            "Unsupported file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Parse the optional `conf_threshold` field; must lie within [0, 1]
pub fn parse_conf_threshold(raw: Option<&str>, default: f64) -> ApiResult<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("conf_threshold must be a number, got '{}'", raw)))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ApiError::BadRequest(format!(
            "conf_threshold must be within [0, 1], got {}",
            value
        )));
    }
    Ok(value)
}

/// Parse an optional boolean form flag
pub fn parse_flag(name: &str, raw: Option<&str>) -> ApiResult<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ApiError::BadRequest(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::BadRequest(format!(
        "File exceeds the maximum upload size of {} MB",
        max_bytes / (1024 * 1024)
    ))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}
