//! Write-path invalidator.
//!
//! Called by the jobs service after a mutation has committed and before the
//! response is built. Each mutation deletes a fixed set of keys, in sequence.

use tracing::debug;

use super::access::CacheAccess;
use super::keys::{CacheBucket, CacheKey};

/// Keys removed by a job mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMutation {
    Created,
    Updated(i64),
    Deleted(i64),
}

impl JobMutation {
    /// Bucket-wide invalidation plus the scalar keys to delete.
    pub fn invalidation_set(&self) -> (CacheBucket, Vec<CacheKey>) {
        match self {
            JobMutation::Created => (CacheBucket::JobListings, Vec::new()),
            JobMutation::Updated(id) | JobMutation::Deleted(id) => {
                (CacheBucket::JobListings, vec![CacheKey::job(*id)])
            }
        }
    }
}

/// Invalidates cached job data after writes.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: CacheAccess,
}

impl CacheInvalidator {
    pub fn new(cache: CacheAccess) -> Self {
        Self { cache }
    }

    /// Delete the invalidation set of `mutation`. Store failures are logged
    /// by the access layer and never surface here.
    pub async fn invalidate(&self, mutation: JobMutation) {
        if !self.cache.is_enabled() {
            debug!(?mutation, "cache invalidation skipped: cache disabled");
            return;
        }

        let (bucket, keys) = mutation.invalidation_set();
        self.cache.invalidate_bucket(bucket).await;
        for key in &keys {
            self.cache.delete(key).await;
        }
        debug!(?mutation, "cache invalidated");
    }

    pub async fn job_created(&self) {
        self.invalidate(JobMutation::Created).await;
    }

    pub async fn job_updated(&self, id: i64) {
        self.invalidate(JobMutation::Updated(id)).await;
    }

    pub async fn job_deleted(&self, id: i64) {
        self.invalidate(JobMutation::Deleted(id)).await;
    }
}
