use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::application::error::ErrorReport;
use crate::application::jobs::JobServiceError;
use crate::application::repos::RepoError;
use crate::application::resumes::ResumeServiceError;
use crate::application::users::UserServiceError;
use crate::infra::uploads::UploadStorageError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    pub success: bool,
}

/// JSON error response; carries an [`ErrorReport`] for the response logger.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<Vec<String>>,
    diagnostic: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            diagnostic: None,
        }
    }

    /// Internal detail that is logged but never sent to the client.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn validation(details: Vec<String>) -> Self {
        Self {
            details: Some(details),
            ..Self::new(StatusCode::BAD_REQUEST, "Validation failed")
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(diagnostic: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            .with_diagnostic(diagnostic)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let diagnostic = self
            .diagnostic
            .clone()
            .unwrap_or_else(|| self.message.clone());
        let body = ApiErrorBody {
            error: self.message,
            details: self.details,
            success: false,
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::api", self.status, diagnostic).attach(&mut response);
        response
    }
}

pub fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => {
            ApiError::conflict("Duplicate record").with_diagnostic(constraint)
        }
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::bad_request(message),
        RepoError::Integrity { message } => {
            ApiError::conflict("Integrity constraint violated").with_diagnostic(message)
        }
        RepoError::Timeout => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
        RepoError::Persistence(message) => ApiError::internal(message),
    }
}

/// Maps a job service error; `not_found` is the route-specific 404 message.
pub fn job_to_api(err: JobServiceError, not_found: &'static str) -> ApiError {
    match err {
        JobServiceError::Repo(err) => repo_to_api(err),
        JobServiceError::NotFound => ApiError::not_found(not_found),
        JobServiceError::Duplicate => ApiError::conflict(
            "A job with the same title, company and description already exists",
        ),
        JobServiceError::Forbidden => {
            ApiError::forbidden("Access denied: only HR users can manage jobs")
        }
    }
}

pub fn user_to_api(err: UserServiceError) -> ApiError {
    match err {
        UserServiceError::Repo(err) => repo_to_api(err),
        UserServiceError::Auth(err) => {
            error!(target = "jobboard::http::auth", error = %err, "token handling failed");
            ApiError::internal(err.to_string())
        }
        UserServiceError::PhoneTaken => {
            ApiError::conflict("User with this phone number already exists")
        }
        UserServiceError::UnknownPhone => {
            ApiError::not_found("User not found with this phone number")
        }
        UserServiceError::InvalidPassword => ApiError::unauthorized("Invalid password"),
        UserServiceError::Unauthorized => ApiError::unauthorized("Invalid or expired token"),
    }
}

pub fn resume_to_api(err: ResumeServiceError) -> ApiError {
    match err {
        ResumeServiceError::Repo(err) => repo_to_api(err),
        ResumeServiceError::NotPdf => ApiError::bad_request("Only PDF files are allowed!"),
        ResumeServiceError::NotFound => ApiError::not_found("Resume not found"),
        ResumeServiceError::Storage(err) => upload_storage_to_api(err),
    }
}

pub fn upload_storage_to_api(err: UploadStorageError) -> ApiError {
    match err {
        UploadStorageError::PayloadTooLarge { limit } => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File exceeds the {limit} byte limit"),
        ),
        UploadStorageError::EmptyPayload => ApiError::bad_request("Uploaded file is empty"),
        UploadStorageError::PayloadStream { source } => {
            ApiError::bad_request("Failed to read uploaded file").with_diagnostic(source.to_string())
        }
        UploadStorageError::InvalidPath => ApiError::not_found("File not found"),
        UploadStorageError::Io(err) => ApiError::internal(err.to_string()),
    }
}
