//! Shared key generation for storage backends.
//!
//! Key format: `ads/{ad_id}/{filename}`. All backends use this layout so a
//! delete handle produced by one backend stays meaningful after a backend
//! swap in tests.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Generate the object key for a listing image.
pub fn generate_image_key(ad_id: Uuid, filename: &str) -> StorageResult<String> {
    validate_key_segment(filename)?;
    Ok(format!("ads/{}/{}", ad_id, filename))
}

/// Reject path traversal and absolute segments before they reach a backend.
pub fn validate_key_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty() || segment.contains("..") || segment.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let ad_id = Uuid::nil();
        let key = generate_image_key(ad_id, "cover.jpg").unwrap();
        assert_eq!(
            key,
            "ads/00000000-0000-0000-0000-000000000000/cover.jpg"
        );
    }

    #[test]
    fn test_traversal_rejected() {
        let ad_id = Uuid::new_v4();
        assert!(generate_image_key(ad_id, "../escape.jpg").is_err());
        assert!(generate_image_key(ad_id, "/absolute.jpg").is_err());
        assert!(generate_image_key(ad_id, "").is_err());
    }
}
