//! Storage adapter for post images.
//!
//! This module provides image storage with support for:
//! - ImageKit (the default, configured by public key, private key and URL endpoint)
//! - S3-compatible object stores through Apache OpenDAL
//! - Local filesystem (development only)
//!
//! When no provider is configured the adapter runs in placeholder mode and
//! never touches the network.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        StorageService                            │
//! │      upload(file, name) -> {url, file_id}   delete(file_id)      │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │   Remote(dyn ImageBackend)   │   Placeholder                    │
//! │   + bounded upload retry     │   placehold.co/600x400?text=...  │
//! ├───────────────┬──────────────┴──────────────────────────────────┤
//! │ ImageKit REST │ OpenDAL (S3 / Fs)                                │
//! └───────────────┴─────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod error;
mod imagekit;
mod object_store;
mod service;

pub use backend::{ImageBackend, ImageFile, StoredImage, UploadObject};
pub use config::{RetryPolicy, StorageConfig, StorageProvider};
pub use error::StorageError;
pub use imagekit::ImageKitBackend;
pub use object_store::ObjectStoreBackend;
pub use service::{DeleteOutcome, PLACEHOLDER_BASE, StorageService, placeholder_url};
