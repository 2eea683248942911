use std::{io::ErrorKind, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde_json::json;
use tracing::error;

use crate::{
    application::{error::ErrorReport, repos::HealthProbe},
    infra::uploads::{UploadStorage, UploadStorageError},
};

use super::{RouterState, api::error::ApiError};

#[derive(Clone)]
pub struct HttpState {
    pub health: Arc<dyn HealthProbe>,
    pub upload_storage: Arc<UploadStorage>,
}

/// Root banner, health probe and stored resume files.
pub fn build_public_router() -> Router<RouterState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/uploads/{*path}", get(serve_upload))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "msg": "Server running" }))
}

async fn health(State(state): State<HttpState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::public::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn serve_upload(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => ApiError::not_found("File not found").into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            ApiError::not_found("File not found").into_response()
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            ApiError::internal(err.to_string()).into_response()
        }
    }
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_guesses_pdf_type() {
        let response = build_upload_response("resumes/2025/01/02/x-cv.pdf", Bytes::from_static(b"%PDF"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[CONTENT_LENGTH], "4");
    }
}
