use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored image
    pub url: String,
}

/// Upload an image (multipart field `file`) into `bucket`
#[utoipa::path(
    post,
    path = "/admin/uploads/{bucket}",
    params(("bucket" = String, Path, description = "Target bucket, lowercase letters, digits, `-` and `_`")),
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 201, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing file or invalid bucket"),
        (status = 502, description = "Storage backend rejected the upload")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Could not read upload: {}", e)))?;

        let url = state
            .storage
            .upload(&bucket, &file_name, content_type.as_deref(), bytes.to_vec())
            .await?;
        tracing::info!(%url, "image uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(AppError::InvalidRequest("Missing multipart field 'file'".to_string()))
}
