//! Read-through middleware for cached job routes.
//!
//! Looks the request up in the external cache before the handler runs. A hit
//! short-circuits with the cached payload; a miss, lookup failure or
//! underivable key runs the handler unchanged. Handlers populate the cache
//! themselves on a miss.

use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::access::CacheAccess;
use super::keys::{CacheKey, JobListParams, JobListQuery};

/// Binds a route to its key derivation and response envelope field.
#[derive(Clone, Copy)]
pub struct CachedRoute {
    /// Envelope field holding the payload (`job` or `jobs`).
    pub field: &'static str,
    /// Derive the cache key; `None` skips the cache.
    pub key: fn(&Request<Body>) -> Option<CacheKey>,
}

impl CachedRoute {
    /// `GET /job-get`
    pub const JOB_LIST: CachedRoute = CachedRoute {
        field: "jobs",
        key: job_list_key,
    };

    /// `GET /job-get/{id}`
    pub const JOB_DETAIL: CachedRoute = CachedRoute {
        field: "job",
        key: job_detail_key,
    };
}

/// Shared state for one read-through binding.
#[derive(Clone)]
pub struct ReadThroughState {
    pub cache: CacheAccess,
    pub route: CachedRoute,
}

impl ReadThroughState {
    pub fn new(cache: CacheAccess, route: CachedRoute) -> Self {
        Self { cache, route }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path(), field = state.route.field))]
pub async fn read_through(
    State(state): State<ReadThroughState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET || !state.cache.is_enabled() {
        return next.run(request).await;
    }

    let Some(key) = (state.route.key)(&request) else {
        debug!("no cache key for request, bypassing cache");
        return next.run(request).await;
    };

    match state.cache.get::<Value>(&key).await {
        Some(cached) => {
            debug!(key = %key, "serving cached payload");
            cached_response(state.route.field, cached)
        }
        None => next.run(request).await,
    }
}

fn cached_response(field: &'static str, cached: Value) -> Response {
    let mut body = Map::new();
    body.insert(field.to_string(), cached);
    body.insert("success".to_string(), Value::Bool(true));
    body.insert("cached".to_string(), Value::Bool(true));
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

/// Listing key from the query string; malformed queries bypass the cache.
pub fn job_list_key(request: &Request<Body>) -> Option<CacheKey> {
    let Query(params) = Query::<JobListParams>::try_from_uri(request.uri()).ok()?;
    let query = JobListQuery::from_params(&params).ok()?;
    Some(CacheKey::job_list(&query))
}

/// Detail key from the trailing path segment.
pub fn job_detail_key(request: &Request<Body>) -> Option<CacheKey> {
    let id = request
        .uri()
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .parse::<i64>()
        .ok()?;
    Some(CacheKey::job(id))
}
