//! Core post logic for Quill.
//!
//! This crate contains the post domain with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `storage` - Image storage adapter (ImageKit, OpenDAL, placeholder fallback)
//! - `post` - Post orchestrator and repository contract

pub mod post;
pub mod storage;
