//! Recognition route handlers: base64 JSON body and multipart upload.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use serde::Deserialize;

use snapcart_catalog::CatalogError;
use snapcart_vision::RecognitionError;

use super::json_error;
use super::state::AppState;

#[derive(Deserialize)]
pub(crate) struct RecognizeRequest {
    image_base64: String,
    /// Declared image media type, defaults to JPEG.
    media_type: Option<String>,
}

/// Map a recognition error to an HTTP response.
///
/// Upstream unavailability is the caller's 502; a model that broke the
/// interaction contract is our 500.
fn recognition_error(e: RecognitionError) -> axum::response::Response {
    match e {
        RecognitionError::Upstream(msg) => {
            json_error(StatusCode::BAD_GATEWAY, &format!("vision upstream: {}", msg))
                .into_response()
        }
        RecognitionError::ProtocolViolation(msg) | RecognitionError::MalformedOutput(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &msg).into_response()
        }
        RecognitionError::Catalog(CatalogError::NotFound { id }) => {
            json_error(StatusCode::NOT_FOUND, &format!("product {} not found", id))
                .into_response()
        }
        RecognitionError::Catalog(CatalogError::Backend(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &msg).into_response()
        }
    }
}

/// POST /recognize
pub(crate) async fn handle_recognize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecognizeRequest>,
) -> impl IntoResponse {
    if request.image_base64.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "missing 'image_base64' field")
            .into_response();
    }
    let media_type = request.media_type.as_deref().unwrap_or("image/jpeg");

    match state
        .pipeline
        .recognize(&request.image_base64, media_type)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => recognition_error(e),
    }
}

/// POST /recognize/file
///
/// Accepts a multipart form; the first part carrying an `image/*` content
/// type is encoded to base64 and fed to the same pipeline.
pub(crate) async fn handle_recognize_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut image: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let media_type = field.content_type().map(|c| c.to_string());
                let is_image = media_type
                    .as_deref()
                    .map(|c| c.starts_with("image/"))
                    .unwrap_or(false);
                if !is_image {
                    continue;
                }
                match field.bytes().await {
                    Ok(bytes) => {
                        image = Some((media_type.unwrap_or_default(), bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            &format!("failed to read upload: {}", e),
                        )
                        .into_response()
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid multipart body: {}", e),
                )
                .into_response()
            }
        }
    }

    let (media_type, bytes) = match image {
        Some(found) => found,
        None => {
            return json_error(StatusCode::BAD_REQUEST, "no image part in upload")
                .into_response()
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    match state.pipeline.recognize(&encoded, &media_type).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => recognition_error(e),
    }
}
