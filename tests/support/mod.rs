#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;

use jobboard::application::auth::{TokenConfig, TokenIssuer, TokenKind};
use jobboard::application::jobs::JobService;
use jobboard::application::pagination::PageRequest;
use jobboard::application::repos::{
    CreateJobParams, CreateUserParams, HealthProbe, JobQueryFilter, JobsRepo, RepoError,
    ResumesRepo, UpdateJobParams, UsersRepo,
};
use jobboard::application::resumes::ResumeService;
use jobboard::application::users::UserService;
use jobboard::cache::{CacheAccess, CacheConfig, KvStore, MemoryStore, StoreError};
use jobboard::domain::entities::{JobRecord, ResumeRecord, UserRecord};
use jobboard::domain::types::{JobType, UserRole};
use jobboard::infra::http::{self, ApiState, HttpState, RouterState};
use jobboard::infra::uploads::UploadStorage;

pub const UPLOAD_LIMIT: u64 = 64 * 1024;

#[derive(Default)]
pub struct InMemoryJobs {
    jobs: Mutex<Vec<JobRecord>>,
    next_id: AtomicI64,
    pub list_calls: AtomicUsize,
    pub find_calls: AtomicUsize,
    failing_reads: AtomicBool,
}

impl InMemoryJobs {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Make `list_jobs` and `find_job` fail until reset.
    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), RepoError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection reset by peer".to_string()));
        }
        Ok(())
    }

    pub async fn seed(&self, count: usize, hr_id: i64) -> Vec<JobRecord> {
        let mut created = Vec::with_capacity(count);
        for n in 0..count {
            let job = self
                .create_job(CreateJobParams {
                    title: format!("Engineer {n}"),
                    description: format!("Build things #{n}"),
                    company_name: if n % 2 == 0 { "Acme" } else { "Globex" }.to_string(),
                    location: Some("Pune".to_string()),
                    salary_range: "10-20 LPA".to_string(),
                    job_type: JobType::FullTime,
                    hr_id,
                })
                .await
                .expect("seed job");
            created.push(job);
        }
        created
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl JobsRepo for InMemoryJobs {
    async fn list_jobs(
        &self,
        filter: &JobQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<JobRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let jobs = self.jobs.lock().await;
        let mut matching: Vec<JobRecord> = jobs
            .iter()
            .filter(|job| {
                filter.search.as_deref().is_none_or(|needle| {
                    contains_ci(&job.title, needle) || contains_ci(&job.description, needle)
                })
            })
            .filter(|job| {
                filter
                    .company_name
                    .as_deref()
                    .is_none_or(|company| job.company_name.to_lowercase() == company)
            })
            .filter(|job| {
                filter.location.as_deref().is_none_or(|location| {
                    job.location.as_deref().map(str::to_lowercase).as_deref() == Some(location)
                })
            })
            .filter(|job| filter.job_type.is_none_or(|job_type| job.job_type == job_type))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_job(&self, id: i64) -> Result<Option<JobRecord>, RepoError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        Ok(self.jobs.lock().await.iter().find(|job| job.id == id).cloned())
    }

    async fn find_duplicate(
        &self,
        title: &str,
        company_name: &str,
        description: &str,
    ) -> Result<Option<JobRecord>, RepoError> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .find(|job| {
                job.title == title
                    && job.company_name == company_name
                    && job.description == description
            })
            .cloned())
    }

    async fn create_job(&self, params: CreateJobParams) -> Result<JobRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let job = JobRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            title: params.title,
            description: params.description,
            company_name: params.company_name,
            location: params.location,
            salary_range: params.salary_range,
            job_type: params.job_type,
            hr_id: params.hr_id,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn update_job(
        &self,
        id: i64,
        params: UpdateJobParams,
    ) -> Result<Option<JobRecord>, RepoError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(None);
        };
        if let Some(title) = params.title {
            job.title = title;
        }
        if let Some(description) = params.description {
            job.description = description;
        }
        if let Some(company_name) = params.company_name {
            job.company_name = company_name;
        }
        if let Some(location) = params.location {
            job.location = location;
        }
        if let Some(salary_range) = params.salary_range {
            job.salary_range = salary_range;
        }
        if let Some(job_type) = params.job_type {
            job.job_type = job_type;
        }
        job.updated_at = OffsetDateTime::now_utc();
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: i64) -> Result<bool, RepoError> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|job| job.id != id);
        Ok(jobs.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<UserRecord>>,
    next_id: AtomicI64,
}

impl InMemoryUsers {
    pub async fn insert(&self, role: UserRole, phone_number: &str) -> UserRecord {
        self.create_user(CreateUserParams {
            name: "Test User".to_string(),
            phone_number: phone_number.to_string(),
            role,
            password_hash: String::new(),
            note: String::new(),
        })
        .await
        .expect("insert user")
    }

    pub async fn stored_refresh_token(&self, id: i64) -> Option<String> {
        self.users
            .lock()
            .await
            .iter()
            .find(|user| user.id == id)
            .and_then(|user| user.refresh_token.clone())
    }
}

#[async_trait]
impl UsersRepo for InMemoryUsers {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|user| user.phone_number == params.phone_number)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_phone_number_key".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: params.name,
            phone_number: params.phone_number,
            role: params.role,
            password_hash: params.password_hash,
            note: params.note,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.phone_number == phone_number)
            .cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn set_refresh_token(
        &self,
        user_id: i64,
        refresh_token: Option<&str>,
    ) -> Result<(), RepoError> {
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(RepoError::NotFound)?;
        user.refresh_token = refresh_token.map(str::to_string);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResumes {
    resumes: Mutex<Vec<ResumeRecord>>,
    next_id: AtomicI64,
}

#[async_trait]
impl ResumesRepo for InMemoryResumes {
    async fn create_resume(
        &self,
        file_url: &str,
        stored_path: &str,
    ) -> Result<ResumeRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ResumeRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            file_url: file_url.to_string(),
            stored_path: stored_path.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.resumes.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find_resume(&self, id: i64) -> Result<Option<ResumeRecord>, RepoError> {
        Ok(self
            .resumes
            .lock()
            .await
            .iter()
            .find(|resume| resume.id == id)
            .cloned())
    }

    async fn delete_resume(&self, id: i64) -> Result<bool, RepoError> {
        let mut resumes = self.resumes.lock().await;
        let before = resumes.len();
        resumes.retain(|resume| resume.id != id);
        Ok(resumes.len() != before)
    }
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Every call fails as if the store were unreachable.
pub struct UnreachableStore;

#[async_trait]
impl KvStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn add_to_index(
        &self,
        _index: &str,
        _member: &str,
        _ttl: Duration,
        _max_members: u64,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn index_members(&self, _index: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn remove_from_index(&self, _index: &str, _members: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Transport("connection refused".to_string()))
    }
}

/// Every call hangs until the caller's timeout fires.
pub struct StalledStore;

#[async_trait]
impl KvStore for StalledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn add_to_index(
        &self,
        _index: &str,
        _member: &str,
        _ttl: Duration,
        _max_members: u64,
    ) -> Result<bool, StoreError> {
        std::future::pending().await
    }

    async fn index_members(&self, _index: &str) -> Result<Vec<String>, StoreError> {
        std::future::pending().await
    }

    async fn remove_from_index(&self, _index: &str, _members: &[String]) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub jobs: Arc<InMemoryJobs>,
    pub users: Arc<InMemoryUsers>,
    pub tokens: Arc<TokenIssuer>,
    _uploads: TempDir,
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "test-access-secret".to_string(),
        refresh_secret: "test-refresh-secret".to_string(),
        access_ttl: Duration::from_secs(60 * 60),
        refresh_ttl: Duration::from_secs(24 * 60 * 60),
        bcrypt_cost: 4,
    }
}

impl TestApp {
    /// App backed by in-memory repositories and `store` (no cache when `None`).
    pub fn new(store: Option<Arc<dyn KvStore>>) -> Self {
        let cache = match store {
            Some(store) => CacheAccess::new(store, CacheConfig::default()),
            None => CacheAccess::disabled(),
        };
        Self::with_cache(cache)
    }

    pub fn with_memory_store() -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Self::new(Some(store.clone())), store)
    }

    pub fn with_cache(cache: CacheAccess) -> Self {
        let uploads = TempDir::new().expect("temp uploads dir");
        let storage = Arc::new(
            UploadStorage::new(uploads.path().to_path_buf(), UPLOAD_LIMIT).expect("upload storage"),
        );

        let jobs = Arc::new(InMemoryJobs::default());
        let users = Arc::new(InMemoryUsers::default());
        let resumes = Arc::new(InMemoryResumes::default());
        let tokens = Arc::new(TokenIssuer::new(token_config()));

        let state = RouterState {
            http: HttpState {
                health: Arc::new(AlwaysHealthy),
                upload_storage: storage.clone(),
            },
            api: ApiState {
                users: Arc::new(UserService::new(users.clone(), tokens.clone())),
                jobs: Arc::new(JobService::new(jobs.clone(), cache.clone())),
                resumes: Arc::new(ResumeService::new(resumes, storage)),
                cache,
                max_upload_bytes: UPLOAD_LIMIT as usize * 2,
            },
        };

        Self {
            router: http::build_router(state),
            jobs,
            users,
            tokens,
            _uploads: uploads,
        }
    }

    /// Insert a user directly and return an access token for it.
    pub async fn token_for(&self, role: UserRole, phone_number: &str) -> (UserRecord, String) {
        let user = self.users.insert(role, phone_number).await;
        let token = self
            .tokens
            .issue(TokenKind::Access, &user)
            .expect("issue access token");
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, None, None)).await
    }
}

pub fn request(
    method: Method,
    uri: &str,
    body: Option<&Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}

pub fn job_payload(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Work on the listing cache",
        "company_name": "Initech",
        "location": "Remote",
        "salary_range": "30-40 LPA",
        "job_type": "Full-Time",
    })
}
