//! Multipart form data parsing.

use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;

use crate::{Result, StorageError, UploadedFile};

/// Re-export multer's Field type.
pub type MultipartField<'a> = multer::Field<'a>;

/// Hard cap on a whole multipart body. Larger than the image limit so
/// oversized images reach validation and get its message.
pub const MAX_BODY_SIZE: u64 = 16 * crate::validation::size::MB;

/// Multipart form data parser.
pub struct Multipart {
    inner: multer::Multipart<'static>,
}

impl Multipart {
    pub fn new<S>(stream: S, boundary: &str) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static,
    {
        let constraints = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(MAX_BODY_SIZE));
        Self {
            inner: multer::Multipart::with_constraints(stream, boundary, constraints),
        }
    }

    /// Parse an already buffered body.
    pub fn from_bytes(content_type: &str, body: Bytes) -> Result<Self> {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| StorageError::Multipart(e.to_string()))?;
        let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });

        Ok(Self::new(stream, &boundary))
    }

    pub async fn next_field(&mut self) -> Result<Option<MultipartField<'static>>> {
        self.inner.next_field().await.map_err(StorageError::from)
    }

    /// Collect all fields (both files and form data).
    pub async fn collect_all(mut self) -> Result<MultipartData> {
        let mut data = MultipartData::default();

        while let Some(field) = self.next_field().await? {
            let name = field.name().map(String::from);

            if field.file_name().is_some() {
                let file = UploadedFile::from_field(field).await?;
                if let Some(name) = name {
                    data.files.insert(name, file);
                }
            } else {
                let text = field.text().await.map_err(StorageError::from)?;
                if let Some(name) = name {
                    data.fields.insert(name, text);
                }
            }
        }

        Ok(data)
    }
}

/// Collected multipart data.
#[derive(Debug, Default)]
pub struct MultipartData {
    /// Form fields (non-file fields).
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Take an uploaded file (removes it from the collection).
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_file_and_field() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            sampul-laut.png\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"laut.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            PNGDATA\r\n\
            --XYZ--\r\n";

        let mut data = Multipart::from_bytes("multipart/form-data; boundary=XYZ", Bytes::from(body))
            .unwrap()
            .collect_all()
            .await
            .unwrap();

        assert_eq!(data.field("name"), Some("sampul-laut.png"));
        let file = data.take_file("file").unwrap();
        assert_eq!(file.name(), Some("laut.png"));
        assert_eq!(file.content_type_str().as_deref(), Some("image/png"));
        assert_eq!(file.data().as_ref(), b"PNGDATA");
    }

    #[test]
    fn test_missing_boundary() {
        assert!(Multipart::from_bytes("application/json", Bytes::new()).is_err());
    }
}
