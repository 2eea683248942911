//! Cache key definitions.
//!
//! Scalar keys address a single job (`job:<id>`). Listing keys live in the
//! `jobs:all` bucket: the canonical unfiltered first page is `jobs:all` itself,
//! every other page/filter combination is `jobs:all:<canonical params>`.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::application::pagination::PageRequest;
use crate::application::repos::JobQueryFilter;
use crate::domain::types::JobType;

const JOB_PREFIX: &str = "job";
const JOBS_ALL: &str = "jobs:all";
const INDEX_SUFFIX: &str = "index";

/// A key in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Detail key for one job.
    pub fn job(id: i64) -> Self {
        Self(format!("{JOB_PREFIX}:{id}"))
    }

    /// Key of the canonical unfiltered first listing page.
    pub fn jobs_all() -> Self {
        Self(JOBS_ALL.to_string())
    }

    /// Listing key for a normalized query.
    pub fn job_list(query: &JobListQuery) -> Self {
        if query.is_canonical() {
            return Self::jobs_all();
        }
        Self(format!("{JOBS_ALL}:{}", query.canonical_params()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key is a composite member of `bucket` (not its root key).
    pub fn is_composite_in(&self, bucket: CacheBucket) -> bool {
        self.0
            .strip_prefix(bucket.root())
            .is_some_and(|rest| rest.starts_with(':'))
            && self.0 != bucket.index_key()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A group of keys invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheBucket {
    /// Every cached job listing page.
    JobListings,
}

impl CacheBucket {
    fn root(self) -> &'static str {
        match self {
            CacheBucket::JobListings => JOBS_ALL,
        }
    }

    /// The bucket's own key (`jobs:all`).
    pub fn root_key(self) -> CacheKey {
        CacheKey(self.root().to_string())
    }

    /// Set tracking the composite keys registered in the bucket.
    pub fn index_key(self) -> String {
        format!("{}:{INDEX_SUFFIX}", self.root())
    }
}

/// Listing query parameters as they arrive on the wire.
///
/// Every field is a string so blank values (`?page=`) can be dropped instead
/// of rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListQueryError {
    #[error("`{field}` must be a positive integer")]
    NotANumber { field: &'static str },
    #[error("`job_type` must be one of Full-Time, Part-Time, Internship, Contract")]
    UnknownJobType,
}

/// Normalized listing query; two requests for the same logical listing
/// normalize to equal values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JobListQuery {
    pub filter: JobQueryFilter,
    pub page: PageRequest,
}

impl JobListQuery {
    pub fn from_params(params: &JobListParams) -> Result<Self, ListQueryError> {
        let page = parse_number(params.page.as_deref(), "page")?;
        let limit = parse_number(params.limit.as_deref(), "limit")?;
        let job_type = match non_blank(params.job_type.as_deref()) {
            Some(raw) => Some(parse_job_type(raw).ok_or(ListQueryError::UnknownJobType)?),
            None => None,
        };

        Ok(Self {
            filter: JobQueryFilter {
                search: free_text(params.search.as_deref()),
                company_name: free_text(params.company_name.as_deref()),
                location: free_text(params.location.as_deref()),
                job_type,
            },
            page: PageRequest::new(page, limit),
        })
    }

    /// Unfiltered first page with the default limit.
    pub fn is_canonical(&self) -> bool {
        self.filter.is_empty() && self.page.is_first_default()
    }

    /// `page` and `limit` always, then each active filter in fixed order.
    fn canonical_params(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("page", &self.page.page.to_string());
        serializer.append_pair("limit", &self.page.limit.to_string());
        if let Some(search) = &self.filter.search {
            serializer.append_pair("search", search);
        }
        if let Some(company) = &self.filter.company_name {
            serializer.append_pair("company_name", company);
        }
        if let Some(location) = &self.filter.location {
            serializer.append_pair("location", location);
        }
        if let Some(job_type) = self.filter.job_type {
            serializer.append_pair("job_type", job_type.as_str());
        }
        serializer.finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn free_text(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_lowercase)
}

fn parse_number(value: Option<&str>, field: &'static str) -> Result<Option<u32>, ListQueryError> {
    non_blank(value)
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| ListQueryError::NotANumber { field })
        })
        .transpose()
}

fn parse_job_type(raw: &str) -> Option<JobType> {
    JobType::ALL
        .into_iter()
        .find(|job_type| job_type.as_str().eq_ignore_ascii_case(raw))
}
