use std::path::Path;

/// Validation errors for uploaded image files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Image file validator
///
/// Checks size, extension and content type before any bytes are decoded.
pub struct ImageValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl ImageValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Validate size, extension and content type in one pass.
    pub fn validate(
        &self,
        filename: &str,
        content_type: &str,
        size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        Ok(())
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Self::extension_of(filename)?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    fn extension_of(filename: &str) -> Result<String, ValidationError> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ImageValidator {
        ImageValidator::new(
            1024,
            vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            vec!["image/jpeg".to_string(), "image/png".to_string()],
        )
    }

    #[test]
    fn test_valid_file_passes() {
        assert!(validator().validate("photo.JPG", "image/jpeg", 512).is_ok());
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            validator().validate("photo.jpg", "image/jpeg", 0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        assert!(matches!(
            validator().validate("photo.jpg", "image/jpeg", 2048),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_bad_extension_rejected() {
        assert!(matches!(
            validator().validate("archive.zip", "image/jpeg", 512),
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_missing_extension_rejected() {
        assert!(matches!(
            validator().validate("noextension", "image/jpeg", 512),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_bad_content_type_rejected() {
        assert!(matches!(
            validator().validate("photo.png", "application/pdf", 512),
            Err(ValidationError::InvalidContentType { .. })
        ));
    }
}
