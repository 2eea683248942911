use serde::{Deserialize, Serialize};

use crate::application::jobs::{CreateJobCommand, UpdateJobCommand};
use crate::application::users::RegisterCommand;
use crate::application::validation::{self, Schema};
use crate::domain::entities::{JobRecord, PublicUser, ResumeRecord};
use crate::domain::types::{JobType, UserRole};

use super::extract::Validated;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub password: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl Validated for RegisterRequest {
    const SCHEMA: Schema = validation::SIGN_UP;
}

impl From<RegisterRequest> for RegisterCommand {
    fn from(request: RegisterRequest) -> Self {
        Self {
            name: request.name,
            phone_number: request.phone_number,
            role: request.role,
            password: request.password,
            note: request.note,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

impl Validated for LoginRequest {
    const SCHEMA: Schema = validation::LOGIN;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validated for RefreshRequest {
    const SCHEMA: Schema = validation::REFRESH;
}

#[derive(Debug, Deserialize)]
pub struct JobCreateRequest {
    pub title: String,
    pub description: String,
    pub company_name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub salary_range: String,
    pub job_type: JobType,
}

impl Validated for JobCreateRequest {
    const SCHEMA: Schema = validation::JOB_CREATE;
}

impl From<JobCreateRequest> for CreateJobCommand {
    fn from(request: JobCreateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            company_name: request.company_name,
            location: request.location,
            salary_range: request.salary_range,
            job_type: request.job_type,
        }
    }
}

/// Partial update; omitted or `null` fields keep their stored value. A blank
/// `location` clears it. `id` is only consulted when neither the path nor the
/// query names the job.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobUpdateRequest {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_type: Option<JobType>,
}

impl Validated for JobUpdateRequest {
    const SCHEMA: Schema = validation::JOB_UPDATE;
}

impl From<JobUpdateRequest> for UpdateJobCommand {
    fn from(request: JobUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            company_name: request.company_name,
            location: request.location,
            salary_range: request.salary_range,
            job_type: request.job_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobIdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub message: &'static str,
    pub access_token: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    pub job: JobRecord,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedResponse {
    pub msg: &'static str,
    pub new_job: JobRecord,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdatedResponse {
    pub msg: &'static str,
    pub updated_job: JobRecord,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct JobDeletedResponse {
    pub msg: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ResumeUploadedResponse {
    pub message: &'static str,
    pub resume: ResumeRecord,
    pub success: bool,
}
