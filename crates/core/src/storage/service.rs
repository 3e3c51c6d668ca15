//! Storage adapter with placeholder fallback and bounded upload retry.

use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::{ImageBackend, ImageFile, StoredImage, UploadObject};
use super::config::{RetryPolicy, StorageConfig, StorageProvider};
use super::error::StorageError;
use super::imagekit::ImageKitBackend;
use super::object_store::ObjectStoreBackend;

/// Base of generated placeholder URLs.
pub const PLACEHOLDER_BASE: &str = "https://placehold.co/600x400";

/// Deterministic placeholder URL for a display name.
#[must_use]
pub fn placeholder_url(display_name: &str) -> String {
    format!("{PLACEHOLDER_BASE}?text={}", urlencoding::encode(display_name))
}

/// Outcome of retiring a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The provider confirmed deletion.
    Deleted,
    /// Nothing to delete: no file id, or no provider configured.
    Skipped,
    /// The provider call failed. The object may be orphaned.
    Failed(String),
}

impl DeleteOutcome {
    /// Whether the remote object was actually deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

enum Mode {
    Remote {
        backend: Arc<dyn ImageBackend>,
        retry: RetryPolicy,
    },
    Placeholder,
}

/// Storage adapter for post images.
///
/// Runs against a real provider when configured and falls back to
/// placeholder URLs, with no network I/O, when it is not.
pub struct StorageService {
    mode: Mode,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mode {
            Mode::Remote { backend, retry } => f
                .debug_struct("StorageService")
                .field("backend", &backend.name())
                .field("retry", retry)
                .finish(),
            Mode::Placeholder => f
                .debug_struct("StorageService")
                .field("backend", &"placeholder")
                .finish(),
        }
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let Some(provider) = config.provider else {
            return Ok(Self::placeholder());
        };

        let backend: Arc<dyn ImageBackend> = match &provider {
            StorageProvider::ImageKit {
                public_key,
                private_key,
                url_endpoint,
            } => Arc::new(ImageKitBackend::new(public_key, private_key, url_endpoint)),
            StorageProvider::S3 { .. } | StorageProvider::LocalFs { .. } => {
                Arc::new(ObjectStoreBackend::from_provider(&provider)?)
            }
        };

        Ok(Self::with_backend(backend, config.retry))
    }

    /// Create a service that always answers with placeholders.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            mode: Mode::Placeholder,
        }
    }

    /// Create a service over an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn ImageBackend>, retry: RetryPolicy) -> Self {
        Self {
            mode: Mode::Remote { backend, retry },
        }
    }

    /// Whether a real provider is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self.mode, Mode::Remote { .. })
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match &self.mode {
            Mode::Remote { backend, .. } => backend.name(),
            Mode::Placeholder => "placeholder",
        }
    }

    /// Upload an image.
    ///
    /// In placeholder mode this returns [`placeholder_url`] of `display_name`
    /// and no file id. Otherwise transient failures are retried under the
    /// configured policy, reusing one object name for every attempt.
    ///
    /// # Errors
    ///
    /// Returns the last provider error once retries are exhausted, or at once
    /// for non-transient failures.
    pub async fn upload(
        &self,
        file: &ImageFile,
        display_name: &str,
    ) -> Result<StoredImage, StorageError> {
        let Mode::Remote { backend, retry } = &self.mode else {
            debug!(display_name, "Storage not configured, using placeholder image");
            return Ok(StoredImage {
                url: placeholder_url(display_name),
                file_id: None,
            });
        };

        let object = UploadObject::for_file(file);
        let mut attempt = 1;
        loop {
            match backend.upload(&object).await {
                Ok(stored) => {
                    debug!(
                        provider = backend.name(),
                        file_id = stored.file_id.as_deref().unwrap_or_default(),
                        attempt,
                        "Image uploaded"
                    );
                    return Ok(stored);
                }
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    warn!(
                        provider = backend.name(),
                        idempotency_key = %object.idempotency_key,
                        attempt,
                        error = %e,
                        "Image upload failed, retrying"
                    );
                    tokio::time::sleep(retry.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete a remote image.
    ///
    /// Never fails: a missing file id or placeholder mode yields
    /// [`DeleteOutcome::Skipped`], a provider failure yields
    /// [`DeleteOutcome::Failed`].
    pub async fn delete(&self, file_id: Option<&str>) -> DeleteOutcome {
        let (Mode::Remote { backend, .. }, Some(file_id)) = (&self.mode, file_id) else {
            debug!("Skipping image delete (no provider or no file id)");
            return DeleteOutcome::Skipped;
        };

        match backend.delete(file_id).await {
            Ok(()) => {
                debug!(provider = backend.name(), file_id, "Image deleted");
                DeleteOutcome::Deleted
            }
            Err(e) => DeleteOutcome::Failed(e.to_string()),
        }
    }
}
