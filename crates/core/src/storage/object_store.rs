//! Object store backend using Apache OpenDAL.

use async_trait::async_trait;
use opendal::{Operator, services};

use super::backend::{ImageBackend, StoredImage, UploadObject};
use super::config::StorageProvider;
use super::error::StorageError;

/// Key prefix for post images.
const KEY_PREFIX: &str = "posts";

/// Image storage on S3-compatible or local filesystem object stores.
///
/// The object key doubles as the provider file id.
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    operator: Operator,
    public_base_url: String,
    provider: &'static str,
}

impl ObjectStoreBackend {
    /// Create a backend from provider config.
    ///
    /// # Errors
    ///
    /// Returns an error for ImageKit providers or if the operator cannot be built.
    pub fn from_provider(provider: &StorageProvider) -> Result<Self, StorageError> {
        let (operator, public_base_url) = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                public_base_url,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                let operator = Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish();
                (operator, public_base_url.clone())
            }
            StorageProvider::LocalFs {
                root,
                public_base_url,
            } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                let operator = Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish();
                (operator, public_base_url.clone())
            }
            StorageProvider::ImageKit { .. } => {
                return Err(StorageError::configuration(
                    "ImageKit is not an object store provider",
                ));
            }
        };

        Ok(Self {
            operator,
            public_base_url,
            provider: provider.name(),
        })
    }

    /// Storage key for an upload.
    ///
    /// Format: `posts/{object_name}`
    #[must_use]
    pub fn storage_key(object: &UploadObject) -> String {
        format!("{KEY_PREFIX}/{}", object.object_name)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ImageBackend for ObjectStoreBackend {
    fn name(&self) -> &'static str {
        self.provider
    }

    async fn upload(&self, object: &UploadObject) -> Result<StoredImage, StorageError> {
        let key = Self::storage_key(object);

        let mut write = self.operator.write_with(&key, object.bytes.clone());
        if let Some(content_type) = &object.content_type {
            write = write.content_type(content_type);
        }
        write.await?;

        Ok(StoredImage {
            url: self.public_url(&key),
            file_id: Some(key),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        self.operator.delete(file_id).await.map_err(StorageError::from)
    }
}
