//! Remote image backend abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::error::StorageError;

/// Image bytes received from a client.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Raw file contents.
    pub bytes: Bytes,
    /// Original client-side file name.
    pub file_name: Option<String>,
    /// Declared content type.
    pub content_type: Option<String>,
}

impl ImageFile {
    /// Create an image file from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            content_type: None,
        }
    }

    /// Set the original file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Whether the file carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One object to write to a backend.
///
/// `object_name` is fixed for the lifetime of one logical upload, so a retried
/// attempt targets the same remote name instead of creating a duplicate.
#[derive(Debug, Clone)]
pub struct UploadObject {
    /// Idempotency key of this logical upload.
    pub idempotency_key: Uuid,
    /// Remote object name, derived from the key and the file name.
    pub object_name: String,
    /// File contents.
    pub bytes: Bytes,
    /// Content type, if known.
    pub content_type: Option<String>,
}

impl UploadObject {
    /// Prepare an upload for the given file.
    #[must_use]
    pub fn for_file(file: &ImageFile) -> Self {
        let idempotency_key = Uuid::new_v4();
        let file_name = file
            .file_name
            .as_deref()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "image".to_string());

        Self {
            idempotency_key,
            object_name: format!("{idempotency_key}-{file_name}"),
            bytes: file.bytes.clone(),
            content_type: file.content_type.clone(),
        }
    }
}

/// Result of a successful remote upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Publicly resolvable image URL.
    pub url: String,
    /// Provider identifier needed for deletion. `None` for placeholders.
    pub file_id: Option<String>,
}

/// A remote blob host that images are written to.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Upload one object.
    async fn upload(&self, object: &UploadObject) -> Result<StoredImage, StorageError>;

    /// Delete an object by its provider file id.
    async fn delete(&self, file_id: &str) -> Result<(), StorageError>;
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
