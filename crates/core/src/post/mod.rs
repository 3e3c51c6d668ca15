//! Post lifecycle orchestration.
//!
//! This module owns consistency between post metadata and remote images:
//! - Create: upload, then persist
//! - Update: upload, persist, then retire the previous image
//! - Delete: best-effort image retirement, then remove metadata

mod error;
mod service;
mod types;

pub use error::PostError;
pub use service::{PostRepository, PostService};
pub use types::{
    CreatePostInput, ImageReplacement, NewPost, Post, PostChanges, PostUpdate, UpdatePostInput,
    display_name,
};
