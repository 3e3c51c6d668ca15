//! Storage configuration types.

use std::path::PathBuf;
use std::time::Duration;

use quill_shared::StorageSettings;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Clone)]
pub enum StorageProvider {
    /// ImageKit media CDN.
    ImageKit {
        /// Public API key.
        public_key: String,
        /// Private API key, used to authenticate server-side calls.
        private_key: String,
        /// URL endpoint images are delivered from.
        url_endpoint: String,
    },
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
        /// Base URL objects are publicly served from.
        public_base_url: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
        /// Base URL the root directory is served from.
        public_base_url: String,
    },
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageKit {
                public_key,
                url_endpoint,
                ..
            } => f
                .debug_struct("ImageKit")
                .field("public_key", public_key)
                .field("url_endpoint", url_endpoint)
                .finish_non_exhaustive(),
            Self::S3 {
                endpoint,
                bucket,
                region,
                ..
            } => f
                .debug_struct("S3")
                .field("endpoint", endpoint)
                .field("bucket", bucket)
                .field("region", region)
                .finish_non_exhaustive(),
            Self::LocalFs {
                root,
                public_base_url,
            } => f
                .debug_struct("LocalFs")
                .field("root", root)
                .field("public_base_url", public_base_url)
                .finish(),
        }
    }
}

impl StorageProvider {
    /// Create ImageKit provider.
    #[must_use]
    pub fn image_kit(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        url_endpoint: impl Into<String>,
    ) -> Self {
        Self::ImageKit {
            public_key: public_key.into(),
            private_key: private_key.into(),
            url_endpoint: url_endpoint.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self::LocalFs {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Resolve a provider from raw settings.
    ///
    /// Returns `Ok(None)` when any credential the selected provider needs is
    /// missing or blank, which selects placeholder mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider kind is unknown.
    pub fn from_settings(settings: &StorageSettings) -> Result<Option<Self>, StorageError> {
        let provider = match settings.provider.trim().to_ascii_lowercase().as_str() {
            "imagekit" | "image_kit" => {
                let (Some(public_key), Some(private_key), Some(url_endpoint)) = (
                    present(settings.public_key.as_ref()),
                    present(settings.private_key.as_ref()),
                    present(settings.url_endpoint.as_ref()),
                ) else {
                    return Ok(None);
                };
                Self::image_kit(public_key, private_key, url_endpoint)
            }
            "s3" => {
                let (
                    Some(endpoint),
                    Some(bucket),
                    Some(access_key_id),
                    Some(secret_access_key),
                    Some(public_base_url),
                ) = (
                    present(settings.url_endpoint.as_ref()),
                    present(settings.bucket.as_ref()),
                    present(settings.access_key_id.as_ref()),
                    present(settings.secret_access_key.as_ref()),
                    present(settings.public_base_url.as_ref()),
                )
                else {
                    return Ok(None);
                };
                Self::S3 {
                    endpoint: endpoint.to_string(),
                    bucket: bucket.to_string(),
                    access_key_id: access_key_id.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                    region: present(settings.region.as_ref()).unwrap_or("auto").to_string(),
                    public_base_url: public_base_url.to_string(),
                }
            }
            "fs" | "local" => {
                let (Some(root), Some(public_base_url)) = (
                    present(settings.root.as_ref()),
                    present(settings.public_base_url.as_ref()),
                ) else {
                    return Ok(None);
                };
                Self::local_fs(root, public_base_url)
            }
            other => {
                return Err(StorageError::configuration(format!(
                    "unknown storage provider '{other}'"
                )));
            }
        };

        Ok(Some(provider))
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageKit { .. } => "imagekit",
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Bounded retry applied to uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Base backoff, multiplied by the attempt number.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Default attempts: 3.
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    /// Default backoff: 200ms.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

    /// Create a retry policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_BACKOFF)
    }
}

/// Storage service configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Storage provider, or `None` for placeholder mode.
    pub provider: Option<StorageProvider>,
    /// Upload retry policy.
    pub retry: RetryPolicy,
}

impl StorageConfig {
    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider: Some(provider),
            retry: RetryPolicy::default(),
        }
    }

    /// Placeholder-mode configuration.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Set the upload retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the storage configuration from application settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider kind is unknown.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        Ok(Self {
            provider: StorageProvider::from_settings(settings)?,
            retry: RetryPolicy::new(
                settings.upload_attempts,
                Duration::from_millis(settings.retry_backoff_ms),
            ),
        })
    }
}
