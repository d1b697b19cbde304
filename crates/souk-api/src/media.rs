use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use souk_types::api::{UploadError, UploadResponse};

use crate::auth::AppState;

/// 5 MB upload ceiling, checked before anything leaves the server.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Fixed square fill-crop applied by the CDN.
const CDN_TRANSFORMATION: &str = "c_fill,w_300,h_300";

/// Media CDN endpoint + credential, from env. When absent the upload
/// endpoint is disabled instead of falling back to a baked-in credential.
#[derive(Clone)]
pub struct CdnConfig {
    pub upload_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct CdnUploadResult {
    secure_url: String,
}

/// Upload failures, rendered as `{ "error": ... }` with an appropriate
/// status so clients can surface them directly.
#[derive(Debug, thiserror::Error)]
pub enum UploadFailure {
    #[error("Image uploads are not configured")]
    NotConfigured,
    #[error("Malformed multipart body")]
    MalformedBody,
    #[error("Failed to read image data")]
    UnreadableImage,
    #[error("No image provided")]
    MissingImage,
    #[error("Image too large (max 5MB)")]
    TooLarge,
    #[error("Invalid image content type")]
    BadContentType,
    #[error("Image upload failed")]
    Upstream,
}

impl UploadFailure {
    fn status(&self) -> StatusCode {
        match self {
            UploadFailure::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            UploadFailure::Upstream => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for UploadFailure {
    fn into_response(self) -> Response {
        let body = Json(UploadError {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// POST /upload. Takes a multipart `image` field, forwarded to the media CDN with
/// a fixed square transformation. Returns `{ "imageUrl": ... }`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadFailure> {
    let Some(cdn) = state.cdn.clone() else {
        return Err(UploadFailure::NotConfigured);
    };

    let mut image: Option<(Vec<u8>, String, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| UploadFailure::MalformedBody)?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| UploadFailure::UnreadableImage)?;
        image = Some((data.to_vec(), file_name, content_type));
    }

    let Some((data, file_name, content_type)) = image else {
        return Err(UploadFailure::MissingImage);
    };
    if data.len() > MAX_IMAGE_BYTES {
        return Err(UploadFailure::TooLarge);
    }

    let part = reqwest::multipart::Part::bytes(data)
        .file_name(file_name)
        .mime_str(&content_type)
        .map_err(|_| UploadFailure::BadContentType)?;
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("transformation", CDN_TRANSFORMATION);

    let response = state
        .http
        .post(&cdn.upload_url)
        .bearer_auth(&cdn.api_key)
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            warn!("CDN upload request failed: {}", e);
            UploadFailure::Upstream
        })?;

    if !response.status().is_success() {
        warn!("CDN upload rejected with status {}", response.status());
        return Err(UploadFailure::Upstream);
    }

    let uploaded: CdnUploadResult = response.json().await.map_err(|e| {
        warn!("CDN upload returned malformed body: {}", e);
        UploadFailure::Upstream
    })?;

    Ok(Json(UploadResponse {
        image_url: uploaded.secure_url,
    }))
}
