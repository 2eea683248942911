use std::sync::Arc;

use crate::application::jobs::JobService;
use crate::application::resumes::ResumeService;
use crate::application::users::UserService;
use crate::cache::CacheAccess;

#[derive(Clone)]
pub struct ApiState {
    pub users: Arc<UserService>,
    pub jobs: Arc<JobService>,
    pub resumes: Arc<ResumeService>,
    pub cache: CacheAccess,
    pub max_upload_bytes: usize,
}
