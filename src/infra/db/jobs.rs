use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::{
        pagination::PageRequest,
        repos::{CreateJobParams, JobQueryFilter, JobsRepo, RepoError, UpdateJobParams},
    },
    domain::{entities::JobRecord, types::JobType},
};

use super::{PostgresRepositories, map_sqlx_error};

const JOB_COLUMNS: &str = "id, title, description, company_name, location, salary_range, \
    job_type, hr_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    title: String,
    description: String,
    company_name: String,
    location: Option<String>,
    salary_range: String,
    job_type: JobType,
    hr_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            company_name: row.company_name,
            location: row.location,
            salary_range: row.salary_range,
            job_type: row.job_type,
            hr_id: row.hr_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Append `WHERE` conditions for every active filter. Free-text filters are
/// already lower-cased.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &JobQueryFilter) {
    let mut separator = " WHERE ";
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(separator);
        qb.push("(title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
        separator = " AND ";
    }
    if let Some(company) = &filter.company_name {
        qb.push(separator);
        qb.push("LOWER(company_name) = ");
        qb.push_bind(company.clone());
        separator = " AND ";
    }
    if let Some(location) = &filter.location {
        qb.push(separator);
        qb.push("LOWER(location) = ");
        qb.push_bind(location.clone());
        separator = " AND ";
    }
    if let Some(job_type) = filter.job_type {
        qb.push(separator);
        qb.push("job_type = ");
        qb.push_bind(job_type);
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl JobsRepo for PostgresRepositories {
    async fn list_jobs(
        &self,
        filter: &JobQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<JobRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<JobRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(JobRecord::from).collect())
    }

    async fn find_job(&self, id: i64) -> Result<Option<JobRecord>, RepoError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(JobRecord::from))
    }

    async fn find_duplicate(
        &self,
        title: &str,
        company_name: &str,
        description: &str,
    ) -> Result<Option<JobRecord>, RepoError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE title = $1 AND company_name = $2 AND description = $3 \
             LIMIT 1"
        ))
        .bind(title)
        .bind(company_name)
        .bind(description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(JobRecord::from))
    }

    async fn create_job(&self, params: CreateJobParams) -> Result<JobRecord, RepoError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "INSERT INTO jobs (title, description, company_name, location, salary_range, job_type, hr_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(params.title)
        .bind(params.description)
        .bind(params.company_name)
        .bind(params.location)
        .bind(params.salary_range)
        .bind(params.job_type)
        .bind(params.hr_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_job(
        &self,
        id: i64,
        params: UpdateJobParams,
    ) -> Result<Option<JobRecord>, RepoError> {
        let location_given = params.location.is_some();
        let location = params.location.flatten();
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE jobs SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                company_name = COALESCE($4, company_name), \
                location = CASE WHEN $8 THEN $5 ELSE location END, \
                salary_range = COALESCE($6, salary_range), \
                job_type = COALESCE($7, job_type), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.company_name)
        .bind(location)
        .bind(params.salary_range)
        .bind(params.job_type)
        .bind(location_given)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(JobRecord::from))
    }

    async fn delete_job(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
