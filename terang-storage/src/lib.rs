//! Image uploads for Terang.
//!
//! Files are checked against a [`FileValidator`] before anything is sent
//! to object storage. The default validator accepts JPEG, PNG and WebP
//! images up to 5MB.
//!
//! ```no_run
//! use std::sync::Arc;
//! use terang_backend::MemoryBackend;
//! use terang_storage::{Bucket, UploadedFile, Uploader};
//!
//! # async fn example() {
//! let backend = MemoryBackend::new().backend();
//! let uploader = Uploader::new(backend.storage.clone());
//! let file = UploadedFile::from_bytes(vec![0u8; 1024], "cover.png");
//! let outcome = uploader.upload(Bucket::Books, &file, None).await;
//! assert!(outcome.url.is_some());
//! # }
//! ```

mod error;
mod file;
mod multipart;
mod upload;
mod validation;

pub use error::{Result, StorageError};
pub use file::{FileInfo, UploadedFile};
pub use multipart::{MAX_BODY_SIZE, Multipart, MultipartData, MultipartField};
pub use upload::{
    Bucket, MultiUpload, UploadOutcome, UploadState, Uploader, object_name, upload_file,
};
pub use validation::{
    FileValidator, IMAGE_TYPES, MAX_IMAGE_SIZE, ValidationError, ValidationRule, size,
};
