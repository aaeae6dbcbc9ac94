//! Verifile Storage Library
//!
//! Storage abstraction for uploaded files with S3 and local filesystem backends.
//!
//! # Storage key format
//!
//! Every upload lands under `uploads/{uuid}/{file name}`, where the file name is
//! reduced to a single safe path segment. Keys never contain `..` or a leading
//! `/`. Key generation lives in the `keys` module so all backends agree.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{file_name_from_key, generate_upload_key, is_upload_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use verifile_core::StorageBackend;
