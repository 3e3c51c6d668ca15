//! Post types and data structures.

use chrono::{DateTime, Utc};
use quill_shared::PostId;

use crate::storage::{ImageFile, StoredImage};

/// Post domain model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Unique identifier.
    pub id: PostId,
    /// Title, may be empty.
    pub title: String,
    /// Caption, may be empty.
    pub caption: String,
    /// Resolvable image URL: a CDN URL or a placeholder.
    pub image_url: String,
    /// Provider file id. Present only when a real upload happened.
    pub storage_file_id: Option<String>,
    /// Cached copy of the uploaded bytes.
    pub raw_image: Option<Vec<u8>>,
    /// Optimistic concurrency version, bumped on every update.
    pub version: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    /// Title.
    pub title: String,
    /// Caption.
    pub caption: String,
    /// Image to upload. Must not be empty.
    pub image: ImageFile,
}

/// Whitelisted fields a client may change on a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    /// New title, if provided.
    pub title: Option<String>,
    /// New caption, if provided.
    pub caption: Option<String>,
}

impl PostChanges {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.caption.is_none()
    }
}

/// Input for updating a post.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    /// Field changes.
    pub changes: PostChanges,
    /// Replacement image, if any.
    pub image: Option<ImageFile>,
}

/// Input for inserting a post record.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Identifier assigned by the caller.
    pub id: PostId,
    /// Title.
    pub title: String,
    /// Caption.
    pub caption: String,
    /// Image URL.
    pub image_url: String,
    /// Provider file id.
    pub storage_file_id: Option<String>,
    /// Cached image bytes.
    pub raw_image: Option<Vec<u8>>,
}

/// Image columns written together when the image is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReplacement {
    /// New image URL.
    pub image_url: String,
    /// New provider file id.
    pub storage_file_id: Option<String>,
    /// New cached image bytes.
    pub raw_image: Option<Vec<u8>>,
}

impl ImageReplacement {
    /// Build from an upload result.
    #[must_use]
    pub fn from_upload(stored: StoredImage, raw_image: Option<Vec<u8>>) -> Self {
        Self {
            image_url: stored.url,
            storage_file_id: stored.file_id,
            raw_image,
        }
    }
}

/// Changes applied to a post record in one repository write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    /// Field changes.
    pub changes: PostChanges,
    /// Image replacement, if any.
    pub image: Option<ImageReplacement>,
}

/// Name used for placeholder images and remote display.
///
/// The title when non-blank, else the file name, else `image`.
#[must_use]
pub fn display_name<'a>(title: &'a str, file_name: Option<&'a str>) -> &'a str {
    if !title.trim().is_empty() {
        return title;
    }
    file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("image")
}
