//! Object storage for rendered station images.
//!
//! One [`ImageStore`] wraps an `object_store` backend (S3, GCS, a local
//! directory, or memory for tests) and places every image under a fixed
//! prefix.

pub mod error;
pub mod object_store;

pub use self::object_store::ImageStore;
pub use error::{StorageError, StorageResult};
