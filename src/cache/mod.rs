//! Job listing cache.
//!
//! A single-node read-through cache in front of one external key-value store:
//!
//! - **Store** (`store`, `upstash`): remote TTL-capable key-value client
//! - **Access** (`access`): JSON payloads, timeouts, degrade-to-miss
//! - **Keys** (`keys`): scalar `job:<id>` and the `jobs:all` listing bucket
//! - **Middleware** (`middleware`): serves hits before the handler runs
//! - **Invalidation** (`invalidation`): deletes affected keys after writes
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! rest_url = "https://example.upstash.io"
//! rest_token = "..."
//! default_ttl_seconds = 3600
//! listing_ttl_seconds = 600
//! timeout_ms = 500
//! max_listing_keys = 1000
//! ```

mod access;
mod config;
mod invalidation;
mod keys;
mod middleware;
mod store;
mod upstash;

pub use access::{
    CacheAccess, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATED_KEYS_TOTAL,
    METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_STORE_ERROR_TOTAL,
};
pub use config::CacheConfig;
pub use invalidation::{CacheInvalidator, JobMutation};
pub use keys::{CacheBucket, CacheKey, JobListParams, JobListQuery, ListQueryError};
pub use middleware::{
    CachedRoute, ReadThroughState, job_detail_key, job_list_key, read_through,
};
pub use store::{KvStore, MemoryStore, StoreError};
pub use upstash::UpstashStore;
