//! Image store abstraction trait.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::models::StoredImageRef;
use bazaar_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Image store abstraction.
///
/// Backends (S3, local filesystem) implement this so the publication
/// workflow can upload and delete listing images without coupling to any
/// provider. The returned [`StoredImageRef`] carries the delete handle the
/// compensation path needs.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload a processed image under `ads/{ad_id}/{filename}`.
    async fn upload(
        &self,
        ad_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredImageRef>;

    /// Delete an image by its delete handle. Deleting a handle that no
    /// longer exists is not an error.
    async fn delete(&self, delete_handle: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
