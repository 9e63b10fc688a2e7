//! Local persistence for the zimu backend.
//!
//! This crate provides:
//! - A JSON-file project store with serialized read-modify-write
//! - The tag list
//! - A content-hashed image cache for thumbnails and avatars

pub mod error;
pub mod image_cache;
mod json_file;
pub mod projects;
pub mod tags;

pub use error::{StorageError, StorageResult};
pub use image_cache::{content_type_for_ext, CachedImage, ImageCache};
pub use projects::{ProjectMap, ProjectStore, INTERRUPTED_MESSAGE};
pub use tags::{TagStore, DEFAULT_TAGS};
