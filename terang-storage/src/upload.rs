//! Validated uploads into the image buckets.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use terang_backend::BlobStorage;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{FileValidator, Result, StorageError, UploadedFile};

/// Buckets holding public images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Books,
    Events,
    Beans,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Books, Bucket::Events, Bucket::Beans];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Books => "books",
            Bucket::Events => "events",
            Bucket::Beans => "beans",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| StorageError::UnknownBucket(s.to_string()))
    }
}

/// Observable state of one upload slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadState {
    pub url: Option<String>,
    pub error: Option<String>,
    pub loading: bool,
}

/// Result of an upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub url: Option<String>,
    pub error: Option<String>,
}

impl UploadOutcome {
    fn failed(message: String) -> Self {
        Self {
            url: None,
            error: Some(message),
        }
    }
}

/// Object name for an upload: the caller's name, or `<unix-millis>.<ext>`
/// where `ext` is the part of the file name after its last dot.
pub fn object_name(file: &UploadedFile, requested: Option<&str>) -> Result<String> {
    if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
        if name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(StorageError::InvalidFileName(name.to_string()));
        }
        return Ok(name.to_string());
    }

    let ext = file
        .name()
        .and_then(|n| n.rsplit('.').next())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .or_else(|| {
            file.content_type()
                .and_then(|m| mime_guess::get_mime_extensions(m))
                .and_then(|exts| exts.first())
                .map(|e| e.to_string())
        })
        .unwrap_or_else(|| "bin".to_string());

    Ok(format!("{}.{}", chrono::Utc::now().timestamp_millis(), ext))
}

fn failure_message(error: &StorageError, fallback: &str) -> String {
    match error {
        StorageError::Backend(e) if e.is_transport() => fallback.to_string(),
        other => other.to_string(),
    }
}

/// Validate `file`, store it, and return its public URL.
///
/// Rejected files never reach `storage`.
pub async fn upload_file(
    storage: &dyn BlobStorage,
    validator: &FileValidator,
    bucket: Bucket,
    file: &UploadedFile,
    name: Option<&str>,
) -> Result<String> {
    validator.validate(file)?;
    let name = object_name(file, name)?;
    let content_type = file
        .content_type_str()
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    storage
        .upload(bucket.as_str(), &name, file.data().clone(), &content_type)
        .await?;
    info!(bucket = %bucket, name = %name, size = file.size(), "image uploaded");

    Ok(storage.public_url(bucket.as_str(), &name))
}

/// Single-slot uploader with observable state.
#[derive(Clone)]
pub struct Uploader {
    storage: Arc<dyn BlobStorage>,
    validator: Arc<FileValidator>,
    state: Arc<watch::Sender<UploadState>>,
}

impl Uploader {
    /// Uploader accepting cover images.
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self::with_validator(storage, FileValidator::cover_images())
    }

    pub fn with_validator(storage: Arc<dyn BlobStorage>, validator: FileValidator) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            storage,
            validator: Arc::new(validator),
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub async fn upload(
        &self,
        bucket: Bucket,
        file: &UploadedFile,
        name: Option<&str>,
    ) -> UploadOutcome {
        self.state.send_replace(UploadState {
            url: None,
            error: None,
            loading: true,
        });

        let outcome = match upload_file(
            self.storage.as_ref(),
            &self.validator,
            bucket,
            file,
            name,
        )
        .await
        {
            Ok(url) => UploadOutcome {
                url: Some(url),
                error: None,
            },
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "upload failed");
                UploadOutcome::failed(failure_message(&e, "Upload failed"))
            }
        };

        self.state.send_replace(UploadState {
            url: outcome.url.clone(),
            error: outcome.error.clone(),
            loading: false,
        });
        outcome
    }

    /// Remove `bucket/name`. Returns the error message on failure.
    pub async fn delete_file(&self, bucket: Bucket, name: &str) -> std::result::Result<(), String> {
        delete_object(self.storage.as_ref(), bucket, name).await
    }

    pub fn reset(&self) {
        self.state.send_replace(UploadState::default());
    }
}

async fn delete_object(
    storage: &dyn BlobStorage,
    bucket: Bucket,
    name: &str,
) -> std::result::Result<(), String> {
    storage
        .remove(bucket.as_str(), &[name.to_string()])
        .await
        .map_err(|e| {
            warn!(bucket = %bucket, name, error = %e, "delete failed");
            failure_message(&StorageError::Backend(e), "Delete failed")
        })
}

/// Uploader tracking several independent slots by key, e.g. one per
/// form field.
#[derive(Clone)]
pub struct MultiUpload {
    storage: Arc<dyn BlobStorage>,
    validator: Arc<FileValidator>,
    slots: Arc<Mutex<HashMap<String, UploadState>>>,
}

impl MultiUpload {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self {
            storage,
            validator: Arc::new(FileValidator::cover_images()),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn set(&self, key: &str, state: UploadState) {
        self.slots.lock().insert(key.to_string(), state);
    }

    pub async fn upload(
        &self,
        key: &str,
        bucket: Bucket,
        file: &UploadedFile,
        name: Option<&str>,
    ) -> UploadOutcome {
        self.set(
            key,
            UploadState {
                url: None,
                error: None,
                loading: true,
            },
        );

        let outcome =
            match upload_file(self.storage.as_ref(), &self.validator, bucket, file, name).await {
                Ok(url) => UploadOutcome {
                    url: Some(url),
                    error: None,
                },
                Err(e) => {
                    warn!(key, bucket = %bucket, error = %e, "upload failed");
                    UploadOutcome::failed(failure_message(&e, "Upload failed"))
                }
            };

        self.set(
            key,
            UploadState {
                url: outcome.url.clone(),
                error: outcome.error.clone(),
                loading: false,
            },
        );
        outcome
    }

    /// Remove `bucket/name` and clear the slot on success.
    pub async fn delete_file(
        &self,
        key: &str,
        bucket: Bucket,
        name: &str,
    ) -> std::result::Result<(), String> {
        delete_object(self.storage.as_ref(), bucket, name).await?;
        self.set(key, UploadState::default());
        Ok(())
    }

    /// State of `key`; idle when never used.
    pub fn get(&self, key: &str) -> UploadState {
        self.slots.lock().get(key).cloned().unwrap_or_default()
    }

    /// Clear one slot, or every slot when `key` is `None`.
    pub fn reset(&self, key: Option<&str>) {
        let mut slots = self.slots.lock();
        match key {
            Some(key) => {
                slots.insert(key.to_string(), UploadState::default());
            }
            None => slots.clear(),
        }
    }
}
