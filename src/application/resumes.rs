//! Resume uploads (PDF only) backed by local storage.

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{RepoError, ResumesRepo};
use crate::domain::entities::ResumeRecord;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// URL prefix under which stored resumes are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum ResumeServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
    #[error("only PDF files are allowed")]
    NotPdf,
    #[error("resume not found")]
    NotFound,
}

#[derive(Clone)]
pub struct ResumeService {
    repo: Arc<dyn ResumesRepo>,
    storage: Arc<UploadStorage>,
}

impl ResumeService {
    pub fn new(repo: Arc<dyn ResumesRepo>, storage: Arc<UploadStorage>) -> Self {
        Self { repo, storage }
    }

    /// Store the payload and record it. The file is removed again when the
    /// record cannot be written.
    pub async fn upload<S>(
        &self,
        filename: &str,
        content_type: Option<&str>,
        payload: S,
    ) -> Result<ResumeRecord, ResumeServiceError>
    where
        S: Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        if !is_pdf(content_type) {
            return Err(ResumeServiceError::NotPdf);
        }

        let stored = self.storage.store_stream(filename, payload).await?;
        let file_url = format!("{UPLOADS_URL_PREFIX}/{}", stored.stored_path);

        match self
            .repo
            .create_resume(&file_url, &stored.stored_path)
            .await
        {
            Ok(record) => {
                info!(
                    resume_id = record.id,
                    size_bytes = stored.size_bytes,
                    checksum = %stored.checksum,
                    "resume uploaded"
                );
                Ok(record)
            }
            Err(err) => {
                if let Err(cleanup) = self.storage.delete(&stored.stored_path).await {
                    warn!(
                        stored_path = %stored.stored_path,
                        error = %cleanup,
                        "failed to remove orphaned resume file"
                    );
                }
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ResumeServiceError> {
        let record = self
            .repo
            .find_resume(id)
            .await?
            .ok_or(ResumeServiceError::NotFound)?;

        self.storage.delete(&record.stored_path).await?;
        if !self.repo.delete_resume(id).await? {
            return Err(ResumeServiceError::NotFound);
        }
        info!(resume_id = id, "resume deleted");
        Ok(())
    }
}

fn is_pdf(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_pdf_content_type() {
        assert!(is_pdf(Some("application/pdf")));
        assert!(is_pdf(Some("Application/PDF; charset=binary")));
        assert!(!is_pdf(Some("image/png")));
        assert!(!is_pdf(None));
    }
}
