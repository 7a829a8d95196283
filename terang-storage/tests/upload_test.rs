//! Uploads against the in-memory backend.

use bytes::Bytes;
use terang_backend::{Failure, MemoryBackend};
use terang_storage::*;

fn png(bytes: usize) -> UploadedFile {
    UploadedFile::from_bytes(vec![0u8; bytes], "sampul.png")
}

#[tokio::test]
async fn test_rejected_files_never_reach_storage() {
    let memory = MemoryBackend::new();
    let uploader = Uploader::new(memory.backend().storage);

    let big = UploadedFile::from_bytes(vec![0u8; size::mb(6) as usize], "besar.jpg");
    let outcome = uploader.upload(Bucket::Books, &big, None).await;
    assert_eq!(outcome.error.as_deref(), Some("File size must be less than 5MB"));
    assert!(outcome.url.is_none());

    let text = UploadedFile::from_bytes(Bytes::from("catatan"), "catatan.txt");
    let outcome = uploader.upload(Bucket::Books, &text, None).await;
    assert_eq!(
        outcome.error.as_deref(),
        Some("Only JPEG, PNG, and WebP images are allowed")
    );

    assert_eq!(memory.upload_calls(), 0);
    let state = uploader.state();
    assert!(!state.loading);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_one_megabyte_png_is_stored() {
    let memory = MemoryBackend::new();
    let uploader = Uploader::new(memory.backend().storage);

    let outcome = uploader
        .upload(Bucket::Events, &png(size::mb(1) as usize), Some("poster.png"))
        .await;

    assert_eq!(
        outcome.url.as_deref(),
        Some("memory://terang/storage/v1/object/public/events/poster.png")
    );
    assert_eq!(memory.upload_calls(), 1);
    let (data, content_type) = memory.object("events", "poster.png").unwrap();
    assert_eq!(data.len(), size::mb(1) as usize);
    assert_eq!(content_type, "image/png");
    assert_eq!(uploader.state().url, outcome.url);

    uploader.reset();
    assert_eq!(uploader.state(), UploadState::default());
}

#[tokio::test]
async fn test_storage_errors_surface() {
    let memory = MemoryBackend::new();
    let uploader = Uploader::new(memory.backend().storage);

    memory.fail("storage:beans", Failure::Api("new row violates row-level security policy".into()));
    let outcome = uploader.upload(Bucket::Beans, &png(10), None).await;
    assert_eq!(
        outcome.error.as_deref(),
        Some("new row violates row-level security policy")
    );

    memory.fail("storage:beans", Failure::Offline);
    let outcome = uploader.upload(Bucket::Beans, &png(10), None).await;
    assert_eq!(outcome.error.as_deref(), Some("Upload failed"));
}

#[tokio::test]
async fn test_delete_file() {
    let memory = MemoryBackend::new();
    let uploader = Uploader::new(memory.backend().storage);

    uploader
        .upload(Bucket::Books, &png(10), Some("lama.png"))
        .await;
    assert!(memory.object("books", "lama.png").is_some());

    uploader.delete_file(Bucket::Books, "lama.png").await.unwrap();
    assert!(memory.object("books", "lama.png").is_none());
}

#[tokio::test]
async fn test_multi_upload_slots() {
    let memory = MemoryBackend::new();
    let uploads = MultiUpload::new(memory.backend().storage);

    uploads
        .upload("cover", Bucket::Books, &png(10), Some("cover.png"))
        .await;
    uploads
        .upload("back", Bucket::Books, &png(size::mb(6) as usize), None)
        .await;

    assert!(uploads.get("cover").url.is_some());
    assert!(uploads.get("back").error.is_some());
    assert_eq!(uploads.get("unused"), UploadState::default());

    uploads.reset(Some("back"));
    assert_eq!(uploads.get("back"), UploadState::default());
    assert!(uploads.get("cover").url.is_some());

    uploads
        .delete_file("cover", Bucket::Books, "cover.png")
        .await
        .unwrap();
    assert_eq!(uploads.get("cover"), UploadState::default());

    uploads.reset(None);
    assert_eq!(uploads.get("cover"), UploadState::default());
}
