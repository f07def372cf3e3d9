//! Oral Scan Adapters - External adapters for oral-scan.
//!
//! This crate provides adapters for:
//! - Filesystem image source
//! - Filesystem overlay store
//! - Model artifact location and checksums

pub mod fs;
pub mod models;

pub use fs::{FsImageSource, FsOverlayStore};
pub use models::{sha256_file, ModelFileStatus, ModelStore, MODEL_FILES};
