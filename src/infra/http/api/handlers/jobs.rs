use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use serde::Deserialize;

use crate::application::users::AuthUser;
use crate::cache::{JobListParams, JobListQuery};

use super::super::error::{ApiError, job_to_api};
use super::super::extract::ValidJson;
use super::super::models::{
    JobCreateRequest, JobCreatedResponse, JobDeletedResponse, JobDetailResponse, JobIdQuery,
    JobListResponse, JobUpdateRequest, JobUpdatedResponse,
};
use super::super::state::ApiState;
use super::parse_id;

const NOT_FOUND: &str = "Job not found";
const NOT_UPDATED: &str = "Job not found or not updated";
const NOT_DELETED: &str = "Job not found or not deleted";

pub async fn list_jobs(
    State(state): State<ApiState>,
    Query(params): Query<JobListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query =
        JobListQuery::from_params(&params).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let jobs = state
        .jobs
        .list(&query)
        .await
        .map_err(|err| job_to_api(err, NOT_FOUND))?;

    Ok(Json(JobListResponse {
        jobs,
        success: true,
    }))
}

pub async fn get_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let job = state
        .jobs
        .get(id)
        .await
        .map_err(|err| job_to_api(err, NOT_FOUND))?;

    Ok(Json(JobDetailResponse { job, success: true }))
}

pub async fn create_job(
    State(state): State<ApiState>,
    Extension(actor): Extension<AuthUser>,
    ValidJson(request): ValidJson<JobCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .jobs
        .create(&actor, request.into())
        .await
        .map_err(|err| job_to_api(err, NOT_FOUND))?;

    Ok((
        StatusCode::CREATED,
        Json(JobCreatedResponse {
            msg: "Job created successfully",
            new_job: job,
            success: true,
        }),
    ))
}

pub async fn update_job(
    State(state): State<ApiState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<JobUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    apply_update(&state, &actor, id, request).await
}

/// `PUT /update-job?id=` or with `id` in the body.
pub async fn update_job_by_query(
    State(state): State<ApiState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<JobIdQuery>,
    ValidJson(request): ValidJson<JobUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = match query.id.as_deref() {
        Some(raw) => parse_id(raw)?,
        None => request.id.ok_or_else(missing_id)?,
    };
    apply_update(&state, &actor, id, request).await
}

async fn apply_update(
    state: &ApiState,
    actor: &AuthUser,
    id: i64,
    request: JobUpdateRequest,
) -> Result<Json<JobUpdatedResponse>, ApiError> {
    let job = state
        .jobs
        .update(actor, id, request.into())
        .await
        .map_err(|err| job_to_api(err, NOT_UPDATED))?;

    Ok(Json(JobUpdatedResponse {
        msg: "Job updated successfully",
        updated_job: job,
        success: true,
    }))
}

pub async fn delete_job(
    State(state): State<ApiState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    apply_delete(&state, &actor, id).await
}

#[derive(Debug, Deserialize)]
struct DeleteBody {
    id: i64,
}

/// `DELETE /delete-job?id=` or with `{"id": ..}` as the body.
pub async fn delete_job_by_query(
    State(state): State<ApiState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<JobIdQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = match query.id.as_deref() {
        Some(raw) => parse_id(raw)?,
        None if body.is_empty() => return Err(missing_id()),
        None => {
            serde_json::from_slice::<DeleteBody>(&body)
                .map_err(|_| missing_id())?
                .id
        }
    };
    apply_delete(&state, &actor, id).await
}

async fn apply_delete(
    state: &ApiState,
    actor: &AuthUser,
    id: i64,
) -> Result<Json<JobDeletedResponse>, ApiError> {
    state
        .jobs
        .delete(actor, id)
        .await
        .map_err(|err| job_to_api(err, NOT_DELETED))?;

    Ok(Json(JobDeletedResponse {
        msg: "Job deleted successfully",
        success: true,
    }))
}

fn missing_id() -> ApiError {
    ApiError::validation(vec!["Job id is required".to_string()])
}
