//! Multipart upload parsing and pre-I/O validation shared by the document,
//! course and image upload endpoints.

use axum::extract::Multipart;
use std::collections::HashMap;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::shared::constants::{DOCUMENTS_FOLDER, IMAGES_FOLDER};

/// Maximum file size in bytes (10MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Body limit for upload routes: file plus room for multipart framing
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

/// pdf, doc, docx, xls, xlsx, txt
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
];

pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Stored extension for every allowed type. Client file names never pick it.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("text/plain", "txt"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Image,
}

impl UploadKind {
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Document => DOCUMENT_MIME_TYPES,
            UploadKind::Image => IMAGE_MIME_TYPES,
        }
    }

    /// Blob store folder for this kind of upload
    pub fn folder(&self) -> &'static str {
        match self {
            UploadKind::Document => DOCUMENTS_FOLDER,
            UploadKind::Image => IMAGES_FOLDER,
        }
    }

    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed_mime_types()
            .contains(&mime_essence(content_type).as_str())
    }
}

/// `Text/Plain; charset=utf-8` -> `text/plain`
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Extension for a content type, `None` for types outside the allow-lists
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = mime_essence(content_type);
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// A file received in a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Reject empty, oversized and disallowed files before touching any store
pub fn validate_upload(file: &UploadedFile, kind: UploadKind) -> Result<()> {
    if file.data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    if file.size() > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            MAX_FILE_SIZE,
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    if !kind.allows(&file.content_type) {
        return Err(AppError::Validation(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            file.content_type,
            kind.allowed_mime_types().join(", ")
        )));
    }

    Ok(())
}

/// Fields read from a multipart upload form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Non-empty text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self) -> Result<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::Validation("No file provided".to_string()))
    }
}

/// Read a multipart body, taking the first part named in `file_fields` as the
/// file and every other named part as text.
pub async fn read_upload_form(mut multipart: Multipart, file_fields: &[&str]) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        if file_fields.contains(&field_name.as_str()) {
            if form.file.is_some() {
                debug!("Ignoring extra file field: {}", field_name);
                continue;
            }

            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let file_name = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unnamed".to_string());

            let data = field.bytes().await.map_err(|e| {
                debug!("Failed to read file bytes: {}", e);
                AppError::BadRequest(format!("Failed to read file data: {}", e))
            })?;

            form.file = Some(UploadedFile {
                data: data.to_vec(),
                file_name,
                content_type,
            });
        } else if !field_name.is_empty() {
            let text = field.text().await.map_err(|e| {
                AppError::BadRequest(format!("Failed to read field '{}': {}", field_name, e))
            })?;
            form.fields.insert(field_name, text);
        }
    }

    Ok(form)
}
