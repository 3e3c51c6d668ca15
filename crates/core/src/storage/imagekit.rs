//! ImageKit backend over the ImageKit REST API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::backend::{ImageBackend, StoredImage, UploadObject};
use super::error::StorageError;

/// ImageKit upload endpoint.
pub const UPLOAD_API: &str = "https://upload.imagekit.io/api/v1/files/upload";
/// ImageKit file management endpoint.
pub const FILES_API: &str = "https://api.imagekit.io/v1/files";

/// Folder uploaded post images are placed in.
const POSTS_FOLDER: &str = "/posts";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// ImageKit-backed image storage.
pub struct ImageKitBackend {
    client: reqwest::Client,
    public_key: String,
    private_key: String,
    url_endpoint: String,
    upload_api: String,
    files_api: String,
}

impl std::fmt::Debug for ImageKitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKitBackend")
            .field("public_key", &self.public_key)
            .field("url_endpoint", &self.url_endpoint)
            .field("upload_api", &self.upload_api)
            .field("files_api", &self.files_api)
            .finish_non_exhaustive()
    }
}

impl ImageKitBackend {
    /// Create a backend talking to the public ImageKit API.
    #[must_use]
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        url_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            public_key: public_key.into(),
            private_key: private_key.into(),
            url_endpoint: url_endpoint.into(),
            upload_api: UPLOAD_API.to_string(),
            files_api: FILES_API.to_string(),
        }
    }

    /// Point the backend at different API hosts.
    #[must_use]
    pub fn with_api_base(
        mut self,
        upload_api: impl Into<String>,
        files_api: impl Into<String>,
    ) -> Self {
        self.upload_api = upload_api.into();
        self.files_api = files_api.into();
        self
    }

    /// Delivery URL for a file path, used when the upload response carries no URL.
    fn delivery_url(&self, file_path: &str) -> String {
        format!(
            "{}/{}",
            self.url_endpoint.trim_end_matches('/'),
            file_path.trim_start_matches('/')
        )
    }

    async fn upstream_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        StorageError::upstream(status, message)
    }
}

#[async_trait]
impl ImageBackend for ImageKitBackend {
    fn name(&self) -> &'static str {
        "imagekit"
    }

    async fn upload(&self, object: &UploadObject) -> Result<StoredImage, StorageError> {
        let mut part = Part::bytes(object.bytes.to_vec()).file_name(object.object_name.clone());
        if let Some(content_type) = &object.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| StorageError::configuration(e.to_string()))?;
        }

        // Unique naming off: a retry overwrites the same object.
        let form = Form::new()
            .part("file", part)
            .text("fileName", object.object_name.clone())
            .text("useUniqueFileName", "false")
            .text("folder", POSTS_FOLDER);

        let response = self
            .client
            .post(&self.upload_api)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: UploadResponse = response.json().await?;
        let url = match (body.url, body.file_path) {
            (Some(url), _) => url,
            (None, Some(path)) => self.delivery_url(&path),
            (None, None) => {
                return Err(StorageError::InvalidResponse(
                    "upload response carries neither url nor filePath".to_string(),
                ));
            }
        };

        Ok(StoredImage {
            url,
            file_id: Some(body.file_id),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        let url = format!("{}/{}", self.files_api.trim_end_matches('/'), file_id);
        let response = self
            .client
            .delete(url)
            .basic_auth(&self.private_key, Some(""))
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            404 => Err(StorageError::not_found(file_id)),
            _ => Err(Self::upstream_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ImageFile;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> ImageKitBackend {
        ImageKitBackend::new("public_test", "private_test", "https://ik.imagekit.io/quill")
            .with_api_base(
                format!("{}/api/v1/files/upload", server.uri()),
                format!("{}/v1/files", server.uri()),
            )
    }

    fn object() -> UploadObject {
        UploadObject::for_file(
            &ImageFile::new(vec![0xFF, 0xD8, 0xFF])
                .with_file_name("cat.jpg")
                .with_content_type("image/jpeg"),
        )
    }

    #[tokio::test]
    async fn test_upload_returns_url_and_file_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/upload"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fileId": "file_123",
                "name": "cat.jpg",
                "url": "https://ik.imagekit.io/quill/posts/cat.jpg",
                "filePath": "/posts/cat.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stored = backend(&server).upload(&object()).await.unwrap();
        assert_eq!(stored.url, "https://ik.imagekit.io/quill/posts/cat.jpg");
        assert_eq!(stored.file_id.as_deref(), Some("file_123"));
    }

    #[tokio::test]
    async fn test_upload_builds_url_from_file_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fileId": "file_456",
                "filePath": "/posts/dog.jpg"
            })))
            .mount(&server)
            .await;

        let stored = backend(&server).upload(&object()).await.unwrap();
        assert_eq!(stored.url, "https://ik.imagekit.io/quill/posts/dog.jpg");
    }

    #[tokio::test]
    async fn test_upload_maps_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/files/upload"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "message": "Your account cannot be authenticated." })),
            )
            .mount(&server)
            .await;

        let err = backend(&server).upload(&object()).await.unwrap_err();
        match err {
            StorageError::Upstream { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Your account cannot be authenticated.");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_success_and_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/files/file_123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/files/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = backend(&server);
        assert!(backend.delete("file_123").await.is_ok());
        assert!(matches!(
            backend.delete("missing").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let backend = ImageKitBackend::new("public_test", "private_test", "https://ik.io");
        assert!(!format!("{backend:?}").contains("private_test"));
    }
}
