//! Post service implementation.

use std::sync::Arc;

use quill_shared::PostId;
use tracing::{debug, info, warn};

use super::error::PostError;
use super::types::{
    CreatePostInput, ImageReplacement, NewPost, Post, PostUpdate, UpdatePostInput, display_name,
};
use crate::storage::{DeleteOutcome, ImageFile, StorageService};

/// Repository trait for post persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// Every method is atomic for a single record.
pub trait PostRepository: Send + Sync {
    /// Insert a new post record, assigning timestamps and the initial version.
    fn insert(
        &self,
        post: NewPost,
    ) -> impl std::future::Future<Output = Result<Post, PostError>> + Send;

    /// List all posts, newest first. Listed posts carry no `raw_image`.
    fn find_all(&self) -> impl std::future::Future<Output = Result<Vec<Post>, PostError>> + Send;

    /// Find post by ID.
    fn find_by_id(
        &self,
        id: PostId,
    ) -> impl std::future::Future<Output = Result<Option<Post>, PostError>> + Send;

    /// Apply an update if the stored version still equals `expected_version`.
    ///
    /// Fails with [`PostError::NotFound`] if the record is gone and with
    /// [`PostError::Conflict`] if another writer got there first.
    fn update(
        &self,
        id: PostId,
        expected_version: i32,
        update: PostUpdate,
    ) -> impl std::future::Future<Output = Result<Post, PostError>> + Send;

    /// Delete post by ID, returning the deleted record.
    fn delete(
        &self,
        id: PostId,
    ) -> impl std::future::Future<Output = Result<Option<Post>, PostError>> + Send;
}

/// Post service coordinating image storage and post metadata.
///
/// Holds no state of its own; every operation runs its steps sequentially.
pub struct PostService<R: PostRepository> {
    storage: Arc<StorageService>,
    repo: Arc<R>,
    retain_raw_image: bool,
}

impl<R: PostRepository> Clone for PostService<R> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            repo: Arc::clone(&self.repo),
            retain_raw_image: self.retain_raw_image,
        }
    }
}

impl<R: PostRepository> PostService<R> {
    /// Create a new post service.
    #[must_use]
    pub fn new(storage: Arc<StorageService>, repo: Arc<R>) -> Self {
        Self {
            storage,
            repo,
            retain_raw_image: true,
        }
    }

    /// Set whether uploaded bytes are cached on the post record.
    #[must_use]
    pub fn with_raw_image_retention(mut self, retain: bool) -> Self {
        self.retain_raw_image = retain;
        self
    }

    /// Get the storage adapter.
    #[must_use]
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    /// Create a post.
    ///
    /// Uploads the image first and only then writes metadata, so an upload
    /// failure leaves no record behind.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The image is empty
    /// - The image upload fails
    /// - The repository insert fails
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostError> {
        if input.image.is_empty() {
            return Err(PostError::validation(
                "No file uploaded. Send a file using form-data.",
            ));
        }

        let name = display_name(&input.title, input.image.file_name.as_deref());
        let stored = self.storage.upload(&input.image, name).await?;

        let new_post = NewPost {
            id: PostId::new(),
            title: input.title,
            caption: input.caption,
            image_url: stored.url,
            storage_file_id: stored.file_id,
            raw_image: self.raw_copy(&input.image),
        };
        let post_id = new_post.id;
        let file_id = new_post.storage_file_id.clone();

        match self.repo.insert(new_post).await {
            Ok(post) => {
                info!(
                    post_id = %post.id,
                    file_id = post.storage_file_id.as_deref().unwrap_or_default(),
                    "Post created"
                );
                Ok(post)
            }
            Err(e) => {
                self.retire(post_id, file_id.as_deref(), "post not persisted")
                    .await;
                Err(e)
            }
        }
    }

    /// List all posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository operation fails.
    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        self.repo.find_all().await
    }

    /// Get post by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the post does not exist or the repository fails.
    pub async fn get(&self, id: PostId) -> Result<Post, PostError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }

    /// Update a post's fields and optionally replace its image.
    ///
    /// Without an image only `title`/`caption` change. With an image the
    /// order is upload, persist, then retire the previous remote object, so a
    /// served record never points at a deleted object.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The post does not exist
    /// - The replacement image is empty
    /// - The image upload fails (nothing is changed)
    /// - The post was modified concurrently
    /// - The repository update fails
    pub async fn update(&self, id: PostId, input: UpdatePostInput) -> Result<Post, PostError> {
        let existing = self.get(id).await?;

        let Some(image) = input.image else {
            let update = PostUpdate {
                changes: input.changes,
                image: None,
            };
            let post = self.repo.update(id, existing.version, update).await?;
            info!(post_id = %id, version = post.version, "Post updated");
            return Ok(post);
        };

        if image.is_empty() {
            return Err(PostError::validation("Uploaded file is empty."));
        }

        let title = input.changes.title.as_deref().unwrap_or(&existing.title);
        let stored = self
            .storage
            .upload(&image, display_name(title, image.file_name.as_deref()))
            .await?;
        let new_file_id = stored.file_id.clone();

        let update = PostUpdate {
            changes: input.changes,
            image: Some(ImageReplacement::from_upload(stored, self.raw_copy(&image))),
        };
        let post = match self.repo.update(id, existing.version, update).await {
            Ok(post) => post,
            Err(e) => {
                self.retire(id, new_file_id.as_deref(), "update not persisted")
                    .await;
                return Err(e);
            }
        };

        if existing.storage_file_id != post.storage_file_id {
            self.retire(id, existing.storage_file_id.as_deref(), "image replaced")
                .await;
        }

        info!(
            post_id = %id,
            version = post.version,
            file_id = post.storage_file_id.as_deref().unwrap_or_default(),
            "Post image replaced"
        );
        Ok(post)
    }

    /// Delete a post and retire its remote image.
    ///
    /// Metadata removal proceeds whatever the outcome of the remote delete.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The post does not exist
    /// - The repository delete fails
    pub async fn delete(&self, id: PostId) -> Result<PostId, PostError> {
        let existing = self.get(id).await?;

        self.retire(id, existing.storage_file_id.as_deref(), "post deleted")
            .await;

        self.repo
            .delete(id)
            .await?
            .ok_or(PostError::NotFound(id))?;

        info!(post_id = %id, "Post deleted");
        Ok(id)
    }

    fn raw_copy(&self, image: &ImageFile) -> Option<Vec<u8>> {
        self.retain_raw_image.then(|| image.bytes.to_vec())
    }

    /// Best-effort delete of a remote object. Failures are logged only.
    async fn retire(&self, post_id: PostId, file_id: Option<&str>, reason: &'static str) {
        match self.storage.delete(file_id).await {
            DeleteOutcome::Deleted => {
                info!(
                    post_id = %post_id,
                    file_id = file_id.unwrap_or_default(),
                    reason,
                    "Remote image deleted"
                );
            }
            DeleteOutcome::Skipped => {
                debug!(post_id = %post_id, reason, "No remote image to delete");
            }
            DeleteOutcome::Failed(error) => {
                warn!(
                    post_id = %post_id,
                    file_id = file_id.unwrap_or_default(),
                    reason,
                    error = %error,
                    "Failed to delete remote image, object may be orphaned"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostChanges;
    use crate::storage::{
        ImageBackend, RetryPolicy, StorageError, StoredImage, UploadObject, placeholder_url,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock repository for testing.
    #[derive(Default)]
    struct MockPostRepository {
        posts: Mutex<HashMap<PostId, Post>>,
        fail_insert: AtomicBool,
        conflict_on_update: AtomicBool,
    }

    impl MockPostRepository {
        fn len(&self) -> usize {
            self.posts.lock().unwrap().len()
        }

        fn stored(&self, id: PostId) -> Option<Post> {
            self.posts.lock().unwrap().get(&id).cloned()
        }
    }

    impl PostRepository for MockPostRepository {
        async fn insert(&self, post: NewPost) -> Result<Post, PostError> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(PostError::repository("connection refused"));
            }
            let now = Utc::now();
            let post = Post {
                id: post.id,
                title: post.title,
                caption: post.caption,
                image_url: post.image_url,
                storage_file_id: post.storage_file_id,
                raw_image: post.raw_image,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            self.posts.lock().unwrap().insert(post.id, post.clone());
            Ok(post)
        }

        async fn find_all(&self) -> Result<Vec<Post>, PostError> {
            let mut posts: Vec<Post> = self.posts.lock().unwrap().values().cloned().collect();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(posts)
        }

        async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
            Ok(self.stored(id))
        }

        async fn update(
            &self,
            id: PostId,
            expected_version: i32,
            update: PostUpdate,
        ) -> Result<Post, PostError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts.get_mut(&id).ok_or(PostError::NotFound(id))?;
            if self.conflict_on_update.load(Ordering::SeqCst) || post.version != expected_version
            {
                return Err(PostError::Conflict(id));
            }
            if let Some(title) = update.changes.title {
                post.title = title;
            }
            if let Some(caption) = update.changes.caption {
                post.caption = caption;
            }
            if let Some(image) = update.image {
                post.image_url = image.image_url;
                post.storage_file_id = image.storage_file_id;
                post.raw_image = image.raw_image;
            }
            post.version += 1;
            post.updated_at = Utc::now();
            Ok(post.clone())
        }

        async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError> {
            Ok(self.posts.lock().unwrap().remove(&id))
        }
    }

    /// Backend recording every call.
    #[derive(Default)]
    struct RecordingBackend {
        uploads: AtomicUsize,
        deleted: Mutex<Vec<String>>,
        fail_upload: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl RecordingBackend {
        fn upload_count(&self) -> usize {
            self.uploads.load(Ordering::SeqCst)
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn upload(&self, object: &UploadObject) -> Result<StoredImage, StorageError> {
            let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(StorageError::upstream(400, "upload rejected"));
            }
            Ok(StoredImage {
                url: format!("https://cdn.example.com/{}", object.object_name),
                file_id: Some(format!("file_{n}")),
            })
        }

        async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(file_id.to_string());
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(StorageError::upstream(500, "delete failed"));
            }
            Ok(())
        }
    }

    struct Harness {
        service: PostService<MockPostRepository>,
        repo: Arc<MockPostRepository>,
        backend: Arc<RecordingBackend>,
    }

    fn configured() -> Harness {
        let repo = Arc::new(MockPostRepository::default());
        let backend = Arc::new(RecordingBackend::default());
        let storage = StorageService::with_backend(backend.clone(), RetryPolicy::none());
        Harness {
            service: PostService::new(Arc::new(storage), repo.clone()),
            repo,
            backend,
        }
    }

    fn unconfigured() -> (PostService<MockPostRepository>, Arc<MockPostRepository>) {
        let repo = Arc::new(MockPostRepository::default());
        let service = PostService::new(Arc::new(StorageService::placeholder()), repo.clone());
        (service, repo)
    }

    fn create_input(title: &str) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            caption: "caption".to_string(),
            image: ImageFile::new(vec![0x89, b'P', b'N', b'G']).with_file_name("photo.png"),
        }
    }

    fn replace_image() -> UpdatePostInput {
        UpdatePostInput {
            changes: PostChanges::default(),
            image: Some(ImageFile::new(vec![1, 2, 3, 4]).with_file_name("new.png")),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_empty_file_without_side_effects() {
        let h = configured();
        let input = CreatePostInput {
            image: ImageFile::new(Vec::new()),
            ..create_input("A")
        };

        let result = h.service.create(input).await;
        assert!(matches!(result, Err(PostError::Validation(_))));
        assert_eq!(h.backend.upload_count(), 0);
        assert_eq!(h.repo.len(), 0);
    }

    #[tokio::test]
    async fn test_create_unconfigured_uses_title_placeholder() {
        let (service, _repo) = unconfigured();

        let post = service.create(create_input("Hello World")).await.unwrap();
        assert_eq!(post.image_url, placeholder_url("Hello World"));
        assert!(post.storage_file_id.is_none());

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, post.id);
        assert!(!listed[0].image_url.is_empty());
    }

    #[tokio::test]
    async fn test_create_configured_persists_file_id_and_raw_copy() {
        let h = configured();

        let post = h.service.create(create_input("A")).await.unwrap();
        assert_eq!(post.storage_file_id.as_deref(), Some("file_1"));
        assert!(post.image_url.starts_with("https://cdn.example.com/"));
        assert_eq!(post.raw_image.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert_eq!(post.version, 1);
    }

    #[tokio::test]
    async fn test_create_without_raw_retention() {
        let h = configured();
        let service = h.service.with_raw_image_retention(false);

        let post = service.create(create_input("A")).await.unwrap();
        assert!(post.raw_image.is_none());
    }

    #[tokio::test]
    async fn test_create_upload_failure_writes_nothing() {
        let h = configured();
        h.backend.fail_upload.store(true, Ordering::SeqCst);

        let result = h.service.create(create_input("A")).await;
        assert!(matches!(result, Err(PostError::Storage(_))));
        assert_eq!(h.repo.len(), 0);
    }

    #[tokio::test]
    async fn test_create_persist_failure_retires_upload() {
        let h = configured();
        h.repo.fail_insert.store(true, Ordering::SeqCst);

        let result = h.service.create(create_input("A")).await;
        assert!(matches!(result, Err(PostError::Repository(_))));
        assert_eq!(h.backend.deleted(), vec!["file_1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_unknown_id_has_no_side_effects() {
        let h = configured();
        let existing = h.service.create(create_input("A")).await.unwrap();

        let result = h.service.update(PostId::new(), replace_image()).await;
        assert!(matches!(result, Err(PostError::NotFound(_))));
        assert_eq!(h.backend.upload_count(), 1);
        assert!(h.backend.deleted().is_empty());
        assert_eq!(h.repo.stored(existing.id), Some(existing));
    }

    #[tokio::test]
    async fn test_update_without_file_preserves_image() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();

        let input = UpdatePostInput {
            changes: PostChanges {
                title: Some("B".to_string()),
                caption: None,
            },
            image: None,
        };
        let updated = h.service.update(created.id, input).await.unwrap();

        assert_eq!(updated.title, "B");
        assert_eq!(updated.caption, created.caption);
        assert_eq!(updated.image_url, created.image_url);
        assert_eq!(updated.storage_file_id, created.storage_file_id);
        assert_eq!(updated.version, created.version + 1);
        assert_eq!(h.backend.upload_count(), 1);
        assert!(h.backend.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_file_retires_old_object_once() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();

        let updated = h.service.update(created.id, replace_image()).await.unwrap();

        assert_eq!(updated.storage_file_id.as_deref(), Some("file_2"));
        assert_ne!(updated.image_url, created.image_url);
        assert_eq!(updated.raw_image.as_deref(), Some(&[1, 2, 3, 4][..]));
        assert_eq!(h.backend.deleted(), vec!["file_1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_upload_failure_keeps_old_object_and_record() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();
        h.backend.fail_upload.store(true, Ordering::SeqCst);

        let result = h.service.update(created.id, replace_image()).await;

        assert!(matches!(result, Err(PostError::Storage(_))));
        assert!(h.backend.deleted().is_empty());
        assert_eq!(h.repo.stored(created.id), Some(created));
    }

    #[tokio::test]
    async fn test_update_conflict_retires_new_upload_only() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();
        h.repo.conflict_on_update.store(true, Ordering::SeqCst);

        let result = h.service.update(created.id, replace_image()).await;

        assert!(matches!(result, Err(PostError::Conflict(_))));
        assert_eq!(h.backend.deleted(), vec!["file_2".to_string()]);
        assert_eq!(h.repo.stored(created.id), Some(created));
    }

    #[tokio::test]
    async fn test_update_old_delete_failure_is_not_fatal() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();
        h.backend.fail_delete.store(true, Ordering::SeqCst);

        let updated = h.service.update(created.id, replace_image()).await.unwrap();
        assert_eq!(updated.storage_file_id.as_deref(), Some("file_2"));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_replacement() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();

        let input = UpdatePostInput {
            changes: PostChanges::default(),
            image: Some(ImageFile::new(Vec::new())),
        };
        let result = h.service.update(created.id, input).await;
        assert!(matches!(result, Err(PostError::Validation(_))));
        assert_eq!(h.backend.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_update_unconfigured_placeholder_uses_new_title() {
        let (service, _repo) = unconfigured();
        let created = service.create(create_input("Old")).await.unwrap();

        let input = UpdatePostInput {
            changes: PostChanges {
                title: Some("New".to_string()),
                caption: None,
            },
            image: Some(ImageFile::new(vec![1])),
        };
        let updated = service.update(created.id, input).await.unwrap();
        assert_eq!(updated.image_url, placeholder_url("New"));
        assert!(updated.storage_file_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_post_and_remote_object() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();

        let deleted = h.service.delete(created.id).await.unwrap();
        assert_eq!(deleted, created.id);
        assert_eq!(h.backend.deleted(), vec!["file_1".to_string()]);
        assert!(h.service.list().await.unwrap().is_empty());

        let again = h.service.delete(created.id).await;
        assert!(matches!(again, Err(PostError::NotFound(_))));
        assert_eq!(h.backend.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_proceeds_when_remote_delete_fails() {
        let h = configured();
        let created = h.service.create(create_input("A")).await.unwrap();
        h.backend.fail_delete.store(true, Ordering::SeqCst);

        h.service.delete(created.id).await.unwrap();
        assert!(h.repo.stored(created.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_unconfigured_skips_remote() {
        let (service, repo) = unconfigured();
        let created = service.create(create_input("A")).await.unwrap();

        service.delete(created.id).await.unwrap();
        assert_eq!(repo.len(), 0);
    }
}
