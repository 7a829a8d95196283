// Image upload endpoints

use terang_auth::ADMIN_API_PREFIX;
use terang_storage::{Bucket, FileValidator, Multipart, upload_file};
use tracing::info;

use super::bind;
use crate::{AppState, HttpRequest, HttpResponse, Result, Router, ServerError};

pub fn register(router: &mut Router, state: &AppState) {
    router
        .post(
            &format!("{}upload/{{bucket}}", ADMIN_API_PREFIX),
            bind(state, upload),
        )
        .delete(
            &format!("{}upload/{{bucket}}/{{name}}", ADMIN_API_PREFIX),
            bind(state, remove),
        );
}

/// Multipart upload: the image in field `file`, an optional object name in
/// field `name`. Answers 201 with the public URL.
async fn upload(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let bucket: Bucket = req.require_param("bucket")?.parse()?;
    let content_type = req
        .content_type()
        .filter(|ct| ct.starts_with("multipart/form-data"))
        .ok_or_else(|| ServerError::BadRequest("expected multipart/form-data".to_string()))?;

    let mut form = Multipart::from_bytes(content_type, req.body.clone())?
        .collect_all()
        .await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| ServerError::BadRequest("missing file field".to_string()))?;

    let backend = state.backend_for(&req)?;
    let url = upload_file(
        backend.storage.as_ref(),
        &FileValidator::cover_images(),
        bucket,
        &file,
        form.field("name"),
    )
    .await?;

    HttpResponse::created().with_json(&serde_json::json!({ "url": url }))
}

async fn remove(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let bucket: Bucket = req.require_param("bucket")?.parse()?;
    let name = req.require_param("name")?.to_string();

    let backend = state.backend_for(&req)?;
    backend.storage.remove(bucket.as_str(), &[name.clone()]).await?;
    info!(%bucket, %name, "image removed");
    Ok(HttpResponse::no_content())
}
