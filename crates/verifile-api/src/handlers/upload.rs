use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;
use verifile_core::models::{
    ConfirmUploadRequest, ConfirmUploadResponse, UploadUrlRequest, UploadUrlResponse,
};
use verifile_core::AppError;

/// Obtain a pre-authorized write target for a verified email
#[utoipa::path(
    post,
    path = "/get-upload-url",
    tag = "uploads",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Write target issued", body = UploadUrlResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing, expired, or foreign upload token", body = ErrorResponse),
        (status = 413, description = "Declared file size over the limit", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(file_type = %request.file_type, operation = "get_upload_url")
)]
pub async fn get_upload_url(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadUrlRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let target = state.uploads.issue_write_target(&request).await?;
    Ok(Json(target))
}

#[derive(Debug, Deserialize)]
pub struct DirectWriteQuery {
    pub token: String,
}

/// Direct write for backends without presigned URLs
#[utoipa::path(
    put,
    path = "/uploads/{upload_id}/{file_name}",
    tag = "uploads",
    params(
        ("upload_id" = String, Path, description = "Upload identifier from the storage key"),
        ("file_name" = String, Path, description = "File name segment of the storage key"),
        ("token" = String, Query, description = "Write token from the upload URL")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File stored"),
        (status = 401, description = "Invalid or expired write token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query, headers, body), fields(operation = "direct_write"))]
pub async fn direct_write(
    State(state): State<Arc<AppState>>,
    Path((upload_id, file_name)): Path<(String, String)>,
    Query(query): Query<DirectWriteQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let key = format!("uploads/{}/{}", upload_id, file_name);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let written = state
        .uploads
        .accept_direct_write(&key, &query.token, content_type, body)
        .await?;

    Ok(Json(serde_json::json!({
        "storageKey": key,
        "sizeBytes": written,
    })))
}

/// Confirm that a direct upload arrived
#[utoipa::path(
    post,
    path = "/confirm-upload",
    tag = "uploads",
    request_body = ConfirmUploadRequest,
    responses(
        (status = 200, description = "Upload present", body = ConfirmUploadResponse),
        (status = 401, description = "Invalid upload token", body = ErrorResponse),
        (status = 404, description = "Nothing stored under the key", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "confirm_upload"))]
pub async fn confirm_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let confirmed = state
        .uploads
        .confirm(&request.storage_key, &request.upload_token)
        .await?;
    Ok(Json(confirmed))
}
