//! Image store abstraction and backends.
//!
//! Listing images live under `ads/{ad_id}/{filename}` on every backend. An
//! upload returns a [`bazaar_core::models::StoredImageRef`] carrying both the
//! public URL and the delete handle (the object key), so deletion never has
//! to parse URLs.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use bazaar_core::StorageBackend;
pub use factory::create_image_store;
#[cfg(feature = "storage-local")]
pub use local::LocalImageStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3ImageStore;
pub use traits::{ImageStore, StorageError, StorageResult};
