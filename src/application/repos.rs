//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{JobRecord, ResumeRecord, UserRecord};
use crate::domain::types::{JobType, UserRole};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Normalized listing filter. Blank values are represented as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JobQueryFilter {
    pub search: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
}

impl JobQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.company_name.is_none()
            && self.location.is_none()
            && self.job_type.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CreateJobParams {
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: Option<String>,
    pub salary_range: String,
    pub job_type: JobType,
    pub hr_id: i64,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateJobParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    /// `None` keeps the stored location; `Some(None)` clears it.
    pub location: Option<Option<String>>,
    pub salary_range: Option<String>,
    pub job_type: Option<JobType>,
}

#[async_trait]
pub trait JobsRepo: Send + Sync {
    async fn list_jobs(
        &self,
        filter: &JobQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<JobRecord>, RepoError>;

    async fn find_job(&self, id: i64) -> Result<Option<JobRecord>, RepoError>;

    async fn find_duplicate(
        &self,
        title: &str,
        company_name: &str,
        description: &str,
    ) -> Result<Option<JobRecord>, RepoError>;

    async fn create_job(&self, params: CreateJobParams) -> Result<JobRecord, RepoError>;

    /// Returns `None` when no job with `id` exists.
    async fn update_job(
        &self,
        id: i64,
        params: UpdateJobParams,
    ) -> Result<Option<JobRecord>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_job(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub password_hash: String,
    pub note: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_user_by_phone(&self, phone_number: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn set_refresh_token(
        &self,
        user_id: i64,
        refresh_token: Option<&str>,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ResumesRepo: Send + Sync {
    async fn create_resume(
        &self,
        file_url: &str,
        stored_path: &str,
    ) -> Result<ResumeRecord, RepoError>;

    async fn find_resume(&self, id: i64) -> Result<Option<ResumeRecord>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_resume(&self, id: i64) -> Result<bool, RepoError>;
}

/// Liveness probe for the primary store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
