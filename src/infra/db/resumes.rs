use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, ResumesRepo},
    domain::entities::ResumeRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ResumeRow {
    id: i64,
    file_url: String,
    stored_path: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        Self {
            id: row.id,
            file_url: row.file_url,
            stored_path: row.stored_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ResumesRepo for PostgresRepositories {
    async fn create_resume(
        &self,
        file_url: &str,
        stored_path: &str,
    ) -> Result<ResumeRecord, RepoError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "INSERT INTO resumes (file_url, stored_path) VALUES ($1, $2) \
             RETURNING id, file_url, stored_path, created_at, updated_at",
        )
        .bind(file_url)
        .bind(stored_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_resume(&self, id: i64) -> Result<Option<ResumeRecord>, RepoError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, file_url, stored_path, created_at, updated_at FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ResumeRecord::from))
    }

    async fn delete_resume(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
