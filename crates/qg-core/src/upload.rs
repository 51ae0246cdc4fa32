//! Uploaded documents for file-mode quizzes.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use thiserror::Error;

use crate::{i18n::ErrorKind, model::FileContent};

/// MIME types accepted as quiz sources
pub const ALLOWED_FILE_TYPES: [&str; 8] = [
    "application/pdf",
    "text/plain",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Aggregate size limit across all uploads of one request
pub const MAX_TOTAL_SIZE_BYTES: u64 = 15 * 1024 * 1024;

/// Check a MIME type against [`ALLOWED_FILE_TYPES`]
pub fn is_allowed_type(mime_type: &str) -> bool {
    ALLOWED_FILE_TYPES.contains(&mime_type)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file '{0}' is not valid base64")]
    InvalidBase64(String),
}

/// A file attached in setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub name: String,
    /// Decoded size in bytes
    pub size: u64,
    pub mime_type: String,
    #[serde(skip)]
    pub content: FileContent,
}

impl Upload {
    /// Build an upload from a base64 payload or a `data:` URL
    ///
    /// The payload is decoded once to learn its real size, so the aggregate
    /// limit never depends on a client-supplied figure.
    pub fn from_base64(name: &str, mime_type: &str, data: &str) -> Result<Self, UploadError> {
        let payload = match data.strip_prefix("data:") {
            Some(url) => url.split_once(',').map_or("", |(_, b64)| b64),
            None => data,
        }
        .trim();

        let size = STANDARD
            .decode(payload)
            .map_err(|_| UploadError::InvalidBase64(name.to_string()))?
            .len() as u64;

        let name = match name.trim() {
            "" => "file".to_string(),
            trimmed => trimmed.to_string(),
        };

        Ok(Self {
            name,
            size,
            mime_type: mime_type.to_string(),
            content: FileContent {
                data: payload.to_string(),
                mime_type: mime_type.to_string(),
            },
        })
    }
}

/// Sum of the sizes of `uploads`
pub fn total_size(uploads: &[Upload]) -> u64 {
    uploads.iter().map(|u| u.size).sum()
}

/// Result of offering new files to the current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Files to append to the selection, possibly empty
    pub accepted: Vec<Upload>,
    /// Error to surface, `None` clears any previous one
    pub error: Option<ErrorKind>,
}

/// Decide which of `incoming` may join `existing`
///
/// Files of a disallowed type are dropped and reported. If the remaining
/// files would push the total past [`MAX_TOTAL_SIZE_BYTES`], none of them are
/// accepted.
pub fn admit(existing: &[Upload], incoming: Vec<Upload>) -> Admission {
    let offered = incoming.len();
    let valid: Vec<Upload> = incoming
        .into_iter()
        .filter(|u| is_allowed_type(&u.mime_type))
        .collect();

    let type_error = (valid.len() != offered).then_some(ErrorKind::FileType);
    if valid.is_empty() {
        return Admission {
            accepted: Vec::new(),
            error: type_error,
        };
    }

    if total_size(existing) + total_size(&valid) > MAX_TOTAL_SIZE_BYTES {
        return Admission {
            accepted: Vec::new(),
            error: Some(ErrorKind::FileSize),
        };
    }

    Admission {
        accepted: valid,
        error: type_error,
    }
}

/// Topic shown for a file-mode quiz: the file names, shortened
pub fn topic_for(uploads: &[Upload]) -> String {
    let names = uploads
        .iter()
        .map(|u| u.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut topic: String = names.chars().take(50).collect();
    if uploads.len() > 1 {
        topic.push_str("...");
    }
    topic
}
