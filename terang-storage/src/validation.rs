//! File validation.

use std::collections::HashSet;
use thiserror::Error;

use crate::UploadedFile;

/// MIME types accepted for cover images and photos.
pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Upper bound for cover images and photos.
pub const MAX_IMAGE_SIZE: u64 = 5 * size::MB;

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File is too large.
    #[error("File size must be less than {}MB", .max / size::MB)]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum size.
        max: u64,
    },

    /// File type not allowed.
    #[error("{message}")]
    TypeNotAllowed {
        /// The rejected MIME type, empty when unknown.
        mime_type: String,
        /// User-facing message.
        message: String,
    },
}

/// A validation rule for files.
pub trait ValidationRule: Send + Sync {
    fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError>;

    /// Rule description for logs.
    fn description(&self) -> &str;
}

/// Ordered set of rules. The first failing rule wins.
#[derive(Default)]
pub struct FileValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl FileValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation rule.
    pub fn rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Set maximum file size.
    pub fn max_size(self, bytes: u64) -> Self {
        self.rule(MaxSizeRule(bytes))
    }

    /// Accept only `types`. Files without a known type are rejected.
    pub fn allowed_types(self, types: &[&str], message: impl Into<String>) -> Self {
        self.rule(AllowedTypesRule {
            types: types.iter().map(|s| s.to_string()).collect(),
            message: message.into(),
        })
    }

    /// JPEG, PNG or WebP up to 5MB.
    pub fn cover_images() -> Self {
        Self::new()
            .allowed_types(IMAGE_TYPES, "Only JPEG, PNG, and WebP images are allowed")
            .max_size(MAX_IMAGE_SIZE)
    }

    pub fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(file) {
                tracing::debug!(rule = rule.description(), error = %e, "file rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

struct MaxSizeRule(u64);

impl ValidationRule for MaxSizeRule {
    fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        if file.size() > self.0 {
            Err(ValidationError::TooLarge {
                size: file.size(),
                max: self.0,
            })
        } else {
            Ok(())
        }
    }

    fn description(&self) -> &str {
        "Maximum file size"
    }
}

struct AllowedTypesRule {
    types: HashSet<String>,
    message: String,
}

impl ValidationRule for AllowedTypesRule {
    fn validate(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        let mime_type = file.content_type_str().unwrap_or_default();
        if self.types.contains(&mime_type) {
            Ok(())
        } else {
            Err(ValidationError::TypeNotAllowed {
                mime_type,
                message: self.message.clone(),
            })
        }
    }

    fn description(&self) -> &str {
        "Allowed MIME types"
    }
}

/// Common file size constants.
pub mod size {
    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * KB;

    pub const fn mb(n: u64) -> u64 {
        n * MB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_cover_image_rules() {
        let validator = FileValidator::cover_images();

        let png = UploadedFile::from_bytes(vec![0u8; size::mb(1) as usize], "cover.png");
        assert!(validator.validate(&png).is_ok());

        let big = UploadedFile::from_bytes(vec![0u8; size::mb(6) as usize], "cover.jpg");
        let err = validator.validate(&big).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 5MB");

        let text = UploadedFile::from_bytes(Bytes::from("hello"), "notes.txt");
        let err = validator.validate(&text).unwrap_err();
        assert_eq!(err.to_string(), "Only JPEG, PNG, and WebP images are allowed");
    }

    #[test]
    fn test_exactly_five_mb_is_allowed() {
        let file = UploadedFile::from_bytes(vec![0u8; MAX_IMAGE_SIZE as usize], "cover.webp");
        assert!(FileValidator::cover_images().validate(&file).is_ok());
    }

    #[test]
    fn test_type_checked_before_size() {
        let file = UploadedFile::from_bytes(vec![0u8; size::mb(6) as usize], "scan.pdf");
        assert!(matches!(
            FileValidator::cover_images().validate(&file),
            Err(ValidationError::TypeNotAllowed { .. })
        ));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let file = UploadedFile::new(Bytes::from_static(b"\x89PNG"));
        assert!(FileValidator::cover_images().validate(&file).is_err());
    }
}
