//! In-memory post repository.
//!
//! Used when no database URL is configured and in HTTP-level tests. Data is
//! lost when the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use quill_core::post::{NewPost, Post, PostError, PostRepository as PostRepoTrait, PostUpdate};
use quill_shared::PostId;

#[derive(Debug, Default)]
struct Inner {
    posts: HashMap<PostId, (u64, Post)>,
    next_seq: u64,
}

/// In-memory post repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPostRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPostRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts.
    pub async fn len(&self) -> usize {
        self.inner.read().await.posts.len()
    }

    /// Whether the repository holds no posts.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl PostRepoTrait for InMemoryPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, PostError> {
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

        let mut inner = self.inner.write().await;
        if inner.posts.contains_key(&post.id) {
            return Err(PostError::repository(format!("duplicate post id {}", post.id)));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.posts.insert(post.id, (seq, post.clone()));
        Ok(post)
    }

    async fn find_all(&self) -> Result<Vec<Post>, PostError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&(u64, Post)> = inner.posts.values().collect();
        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
        });
        Ok(entries
            .into_iter()
            .map(|(_, post)| Post {
                raw_image: None,
                ..post.clone()
            })
            .collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        Ok(self
            .inner
            .read()
            .await
            .posts
            .get(&id)
            .map(|(_, post)| post.clone()))
    }

    async fn update(
        &self,
        id: PostId,
        expected_version: i32,
        update: PostUpdate,
    ) -> Result<Post, PostError> {
        let mut inner = self.inner.write().await;
        let (_, post) = inner.posts.get_mut(&id).ok_or(PostError::NotFound(id))?;
        if post.version != expected_version {
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
        Ok(self
            .inner
            .write()
            .await
            .posts
            .remove(&id)
            .map(|(_, post)| post))
    }
}
