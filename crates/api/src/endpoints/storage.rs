//! Storage endpoints.

use askanai_common::AppResult;
use askanai_core::SignedUpload;
use axum::{Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{
    extractors::{JsonBody, RequestCaller},
    middleware::AppState,
    response::ApiResponse,
};

/// Signed upload request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignUploadRequest {
    pub content_type: String,
}

/// Issue a signed upload URL for a poll preview image.
async fn poll_image_signed_upload(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    JsonBody(req): JsonBody<SignUploadRequest>,
) -> AppResult<ApiResponse<SignedUpload>> {
    let upload = state
        .upload_service
        .sign_poll_image_upload(&req.content_type, &caller)
        .await?;
    Ok(ApiResponse::ok(upload))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/poll-image-signed-upload", post(poll_image_signed_upload))
}
