//! Post error types.

use quill_shared::{AppError, PostId};
use thiserror::Error;

use crate::storage::StorageError;

/// Post operation errors.
#[derive(Debug, Error)]
pub enum PostError {
    /// Required upload input is missing.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Post not found.
    #[error("post not found: {0}")]
    NotFound(PostId),

    /// Post was modified concurrently.
    #[error("post was modified concurrently: {0}")]
    Conflict(PostId),

    /// Image upload failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl PostError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Validation(msg) => Self::Validation(msg),
            PostError::NotFound(id) => Self::NotFound(format!("post {id}")),
            PostError::Conflict(id) => Self::Conflict(format!("post {id} was modified concurrently")),
            PostError::Storage(e) => Self::ExternalService(e.to_string()),
            PostError::Repository(msg) => Self::Database(msg),
        }
    }
}
