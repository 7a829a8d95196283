//! Uploaded file types.

use bytes::Bytes;
use mime::Mime;
use std::path::Path;

use crate::{MultipartField, Result, StorageError};

/// Information about an uploaded file.
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    /// Original file name.
    pub name: Option<String>,
    pub extension: Option<String>,
    pub content_type: Option<Mime>,
    /// File size in bytes.
    pub size: u64,
}

/// An uploaded file with its data.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub info: FileInfo,
    pub data: Bytes,
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
}

impl UploadedFile {
    /// A nameless file of unknown type.
    pub fn new(data: Bytes) -> Self {
        Self {
            info: FileInfo {
                size: data.len() as u64,
                ..Default::default()
            },
            data,
        }
    }

    /// Read a multipart file field. The declared content type wins over
    /// the one guessed from the file name.
    pub async fn from_field(field: MultipartField<'_>) -> Result<Self> {
        let name = field.file_name().map(String::from);
        let content_type = field
            .content_type()
            .cloned()
            .filter(|m| *m != mime::APPLICATION_OCTET_STREAM)
            .or_else(|| name.as_deref().and_then(|n| mime_guess::from_path(n).first()));
        let extension = name.as_deref().and_then(extension_of);

        let data = field.bytes().await.map_err(StorageError::from)?;
        let size = data.len() as u64;

        Ok(Self {
            info: FileInfo {
                name,
                extension,
                content_type,
                size,
            },
            data,
        })
    }

    /// Create from raw bytes, guessing the type from `name`.
    pub fn from_bytes(data: impl Into<Bytes>, name: impl Into<String>) -> Self {
        let data = data.into();
        let name = name.into();

        Self {
            info: FileInfo {
                extension: extension_of(&name),
                content_type: mime_guess::from_path(&name).first(),
                name: Some(name),
                size: data.len() as u64,
            },
            data,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.info.extension.as_deref()
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.info.content_type.as_ref()
    }

    pub fn content_type_str(&self) -> Option<String> {
        self.info.content_type.as_ref().map(|ct| ct.essence_str().to_string())
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.info.content_type = Some(content_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_guesses_type() {
        let file = UploadedFile::from_bytes(Bytes::from_static(b"abc"), "Sampul.JPG");
        assert_eq!(file.extension(), Some("JPG"));
        assert_eq!(file.content_type_str().as_deref(), Some("image/jpeg"));
        assert_eq!(file.size(), 3);
    }

    #[test]
    fn test_content_type_override() {
        let file = UploadedFile::new(Bytes::from_static(b"abc")).with_content_type(mime::IMAGE_PNG);
        assert_eq!(file.content_type_str().as_deref(), Some("image/png"));
        assert!(file.name().is_none());
    }
}
