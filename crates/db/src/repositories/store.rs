//! Runtime selection between the Postgres and in-memory repositories.

use sea_orm::DatabaseConnection;

use super::memory::InMemoryPostRepository;
use super::post::PostRepository;
use quill_core::post::{NewPost, Post, PostError, PostRepository as PostRepoTrait, PostUpdate};
use quill_shared::PostId;

/// Post repository chosen at startup.
#[derive(Debug, Clone)]
pub enum PostStore {
    /// Postgres via `SeaORM`.
    Postgres(PostRepository),
    /// Process-local map.
    Memory(InMemoryPostRepository),
}

impl PostStore {
    /// Store backed by a database connection.
    #[must_use]
    pub const fn postgres(db: DatabaseConnection) -> Self {
        Self::Postgres(PostRepository::new(db))
    }

    /// Empty in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(InMemoryPostRepository::new())
    }

    /// Backend name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl PostRepoTrait for PostStore {
    async fn insert(&self, post: NewPost) -> Result<Post, PostError> {
        match self {
            Self::Postgres(repo) => repo.insert(post).await,
            Self::Memory(repo) => repo.insert(post).await,
        }
    }

    async fn find_all(&self) -> Result<Vec<Post>, PostError> {
        match self {
            Self::Postgres(repo) => repo.find_all().await,
            Self::Memory(repo) => repo.find_all().await,
        }
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        match self {
            Self::Postgres(repo) => repo.find_by_id(id).await,
            Self::Memory(repo) => repo.find_by_id(id).await,
        }
    }

    async fn update(
        &self,
        id: PostId,
        expected_version: i32,
        update: PostUpdate,
    ) -> Result<Post, PostError> {
        match self {
            Self::Postgres(repo) => repo.update(id, expected_version, update).await,
            Self::Memory(repo) => repo.update(id, expected_version, update).await,
        }
    }

    async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError> {
        match self {
            Self::Postgres(repo) => repo.delete(id).await,
            Self::Memory(repo) => repo.delete(id).await,
        }
    }
}
