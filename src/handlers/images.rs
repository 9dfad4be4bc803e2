use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::utils::response::{empty_success, success};
use crate::utils::AppError;

use super::AppState;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Multipart upload; only the `file` field is read, image content types
/// only, capped at 10 MiB.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::ValidationError(format!("Malformed multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.jpg").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::ValidationError(
                "Only image uploads are accepted".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::ValidationError(format!("Failed to read upload: {err}")))?;
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::ValidationError(
                "Image exceeds the 10 MiB limit".to_string(),
            ));
        }

        let Some(url) = state.media.upload(data, &file_name, &content_type).await else {
            return Err(AppError::ExternalServiceError(
                "image upload failed".to_string(),
            ));
        };
        return Ok(success(json!({ "url": url }), "Image uploaded").into_response());
    }

    Err(AppError::ValidationError(
        "Multipart field 'file' is required".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageQuery {
    pub url: String,
}

pub async fn delete_image(
    State(state): State<AppState>,
    Query(query): Query<DeleteImageQuery>,
) -> Result<Response, AppError> {
    if state.media.delete(&query.url).await {
        Ok(empty_success("Image deleted").into_response())
    } else {
        Err(AppError::ExternalServiceError(
            "image deletion failed".to_string(),
        ))
    }
}

pub async fn list_images(State(state): State<AppState>) -> Result<Response, AppError> {
    let images = state.media.list().await;
    Ok(success(json!({ "images": images }), "Images listed").into_response())
}
