//! Job postings: read paths populate the cache, write paths invalidate it.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateJobParams, JobsRepo, RepoError, UpdateJobParams};
use crate::application::users::AuthUser;
use crate::cache::{CacheAccess, CacheBucket, CacheInvalidator, CacheKey, JobListQuery};
use crate::domain::entities::JobRecord;
use crate::domain::types::JobType;

#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("job not found")]
    NotFound,
    #[error("a job with this title, company and description already exists")]
    Duplicate,
    #[error("only HR users may manage job postings")]
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct CreateJobCommand {
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: Option<String>,
    pub salary_range: String,
    pub job_type: JobType,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateJobCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_type: Option<JobType>,
}

#[derive(Clone)]
pub struct JobService {
    repo: Arc<dyn JobsRepo>,
    cache: CacheAccess,
    invalidator: CacheInvalidator,
}

impl JobService {
    pub fn new(repo: Arc<dyn JobsRepo>, cache: CacheAccess) -> Self {
        let invalidator = CacheInvalidator::new(cache.clone());
        Self {
            repo,
            cache,
            invalidator,
        }
    }

    /// Primary fetch for a listing page; a successful fetch populates the
    /// listing bucket with `listing_ttl_seconds`.
    pub async fn list(&self, query: &JobListQuery) -> Result<Vec<JobRecord>, JobServiceError> {
        let jobs = self.repo.list_jobs(&query.filter, query.page).await?;
        let ttl = self.cache.config().listing_ttl();
        self.cache
            .set_in_bucket(
                CacheBucket::JobListings,
                &CacheKey::job_list(query),
                &jobs,
                Some(ttl),
            )
            .await;
        Ok(jobs)
    }

    /// Primary fetch for one job; a hit populates `job:<id>`.
    pub async fn get(&self, id: i64) -> Result<JobRecord, JobServiceError> {
        let job = self
            .repo
            .find_job(id)
            .await?
            .ok_or(JobServiceError::NotFound)?;
        self.cache.set(&CacheKey::job(id), &job, None).await;
        Ok(job)
    }

    pub async fn create(
        &self,
        actor: &AuthUser,
        cmd: CreateJobCommand,
    ) -> Result<JobRecord, JobServiceError> {
        ensure_hr(actor)?;

        let title = cmd.title.trim().to_string();
        let company_name = cmd.company_name.trim().to_string();
        let description = cmd.description.trim().to_string();
        if self
            .repo
            .find_duplicate(&title, &company_name, &description)
            .await?
            .is_some()
        {
            return Err(JobServiceError::Duplicate);
        }

        let job = self
            .repo
            .create_job(CreateJobParams {
                title,
                description,
                company_name,
                location: non_blank(cmd.location),
                salary_range: cmd.salary_range.trim().to_string(),
                job_type: cmd.job_type,
                hr_id: actor.id,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => JobServiceError::Duplicate,
                other => JobServiceError::Repo(other),
            })?;

        self.invalidator.job_created().await;
        info!(job_id = job.id, hr_id = actor.id, "job created");
        Ok(job)
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        id: i64,
        cmd: UpdateJobCommand,
    ) -> Result<JobRecord, JobServiceError> {
        ensure_hr(actor)?;

        let params = UpdateJobParams {
            title: trimmed(cmd.title),
            description: trimmed(cmd.description),
            company_name: trimmed(cmd.company_name),
            location: cmd.location.map(|location| non_blank(Some(location))),
            salary_range: trimmed(cmd.salary_range),
            job_type: cmd.job_type,
        };
        let job = self
            .repo
            .update_job(id, params)
            .await?
            .ok_or(JobServiceError::NotFound)?;

        self.invalidator.job_updated(id).await;
        info!(job_id = id, hr_id = actor.id, "job updated");
        Ok(job)
    }

    pub async fn delete(&self, actor: &AuthUser, id: i64) -> Result<(), JobServiceError> {
        ensure_hr(actor)?;

        if !self.repo.delete_job(id).await? {
            return Err(JobServiceError::NotFound);
        }

        self.invalidator.job_deleted(id).await;
        info!(job_id = id, hr_id = actor.id, "job deleted");
        Ok(())
    }
}

fn ensure_hr(actor: &AuthUser) -> Result<(), JobServiceError> {
    if actor.is_hr() {
        Ok(())
    } else {
        Err(JobServiceError::Forbidden)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    trimmed(value).filter(|value| !value.is_empty())
}
