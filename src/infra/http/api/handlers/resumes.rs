use axum::Json;
use axum::extract::{Extension, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::TryStreamExt;

use crate::application::users::AuthUser;
use crate::infra::uploads::UploadStorageError;

use super::super::error::{ApiError, resume_to_api};
use super::super::models::{MessageResponse, ResumeUploadedResponse};
use super::super::state::ApiState;
use super::parse_id;

const RESUME_FIELD: &str = "resume";
const FALLBACK_FILENAME: &str = "resume.pdf";

/// Multipart upload; the `resume` field is streamed straight to storage.
pub async fn upload_resume(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::new(err.status(), "Invalid multipart payload").with_diagnostic(err.body_text())
    })? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let payload = field.map_err(|err| UploadStorageError::PayloadStream {
            source: Box::new(err),
        });

        let resume = state
            .resumes
            .upload(&filename, content_type.as_deref(), payload)
            .await
            .map_err(resume_to_api)?;

        tracing::debug!(user_id = user.id, resume_id = resume.id, "resume stored");
        return Ok((
            StatusCode::CREATED,
            Json(ResumeUploadedResponse {
                message: "Resume uploaded successfully",
                resume,
                success: true,
            }),
        ));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

pub async fn delete_resume(
    State(state): State<ApiState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.resumes.delete(id).await.map_err(resume_to_api)?;

    Ok(Json(MessageResponse {
        message: "Resume deleted successfully",
        success: true,
    }))
}
