//! Cache access layer.
//!
//! Serializes domain payloads to JSON and talks to the [`KvStore`]. Every
//! store round trip is bounded by `timeout_ms`; failures and timeouts are
//! logged and absorbed so no cache error reaches a caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CacheBucket, CacheKey};
use super::store::{KvStore, StoreError};

pub const METRIC_CACHE_HIT_TOTAL: &str = "jobboard_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "jobboard_cache_miss_total";
pub const METRIC_CACHE_STORE_ERROR_TOTAL: &str = "jobboard_cache_store_error_total";
pub const METRIC_CACHE_INVALIDATED_KEYS_TOTAL: &str =
    "jobboard_cache_invalidated_keys_total";

/// Keys per `DEL` round trip.
const DELETE_BATCH: usize = 100;

/// Handle to the external cache shared by middleware, services and the
/// invalidator.
#[derive(Clone)]
pub struct CacheAccess {
    store: Option<Arc<dyn KvStore>>,
    config: CacheConfig,
}

impl CacheAccess {
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let store = config.enabled.then_some(store);
        Self { store, config }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            store: None,
            config: CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Run one store call under the configured timeout.
    ///
    /// Returns `None` when the cache is disabled, the call fails or it
    /// exceeds the timeout.
    async fn bounded<'a, T, F, Fut>(&'a self, op: &'static str, key: &str, call: F) -> Option<T>
    where
        F: FnOnce(&'a dyn KvStore) -> Fut,
        Fut: Future<Output = Result<T, StoreError>> + 'a,
    {
        let store = self.store.as_deref()?;
        let timeout = self.config.timeout();
        let outcome = match tokio::time::timeout(timeout, call(store)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(timeout)),
        };
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                counter!(METRIC_CACHE_STORE_ERROR_TOTAL, "op" => op).increment(1);
                warn!(op, key, error = %err, "cache store call failed");
                None
            }
        }
    }

    /// Look up `key`. Store failures, timeouts and unreadable payloads are
    /// reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }

        let raw = self
            .bounded("get", key.as_str(), |store| store.get(key.as_str()))
            .await
            .flatten();

        let Some(raw) = raw else {
            counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
            debug!(key = %key, outcome = "miss", "cache lookup");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
                debug!(key = %key, outcome = "hit", "cache lookup");
                Some(value)
            }
            Err(err) => {
                counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
                warn!(key = %key, error = %err, "discarding unreadable cache payload");
                None
            }
        }
    }

    /// Store `value` under `key`. `ttl` defaults to `default_ttl_seconds`.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let Some(payload) = encode(key, value) else {
            return;
        };
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        if self
            .bounded("set", key.as_str(), |store| {
                store.set(key.as_str(), &payload, ttl)
            })
            .await
            .is_some()
        {
            debug!(key = %key, ttl_secs = ttl.as_secs(), "cache populated");
        }
    }

    /// Store `value` under a key belonging to `bucket`.
    ///
    /// Composite keys are registered in the bucket index before the value is
    /// written, so a later [`Self::invalidate_bucket`] never misses a live
    /// entry. If registration fails, or the index already tracks
    /// `max_listing_keys` other keys, the value is not written.
    pub async fn set_in_bucket<T: Serialize + ?Sized>(
        &self,
        bucket: CacheBucket,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        if key.is_composite_in(bucket) {
            let index = bucket.index_key();
            // The index must outlive the value written after it.
            let index_ttl = ttl + self.config.timeout() * 2;
            let max_members = self.config.max_listing_keys;
            let registered = self
                .bounded("index", &index, |store| {
                    store.add_to_index(&index, key.as_str(), index_ttl, max_members)
                })
                .await;
            match registered {
                Some(true) => {}
                Some(false) => {
                    debug!(key = %key, max_members, "bucket index full; not caching");
                    return;
                }
                None => return,
            }
        }
        self.set(key, value, Some(ttl)).await;
    }

    /// Best-effort delete of one key.
    pub async fn delete(&self, key: &CacheKey) {
        self.delete_keys(&[key.to_string()]).await;
    }

    /// Delete the bucket root and every composite key registered in the
    /// bucket index.
    ///
    /// Members are dropped from the index only once their keys are gone, and
    /// an unreadable index is left intact, so a later invalidation still
    /// reaches every key a failed one missed.
    pub async fn invalidate_bucket(&self, bucket: CacheBucket) {
        if !self.is_enabled() {
            return;
        }
        self.delete_keys(&[bucket.root_key().to_string()]).await;

        let index = bucket.index_key();
        let Some(members) = self
            .bounded("members", &index, |store| store.index_members(&index))
            .await
        else {
            return;
        };
        for batch in members.chunks(DELETE_BATCH) {
            if self.delete_keys(batch).await {
                self.bounded("unindex", &index, |store| {
                    store.remove_from_index(&index, batch)
                })
                .await;
            }
        }
    }

    /// Delete `keys` in batches; returns whether every batch succeeded.
    async fn delete_keys(&self, keys: &[String]) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let mut complete = true;
        for batch in keys.chunks(DELETE_BATCH) {
            let label = describe_batch(batch);
            if self
                .bounded("delete", &label, |store| store.delete(batch))
                .await
                .is_some()
            {
                counter!(METRIC_CACHE_INVALIDATED_KEYS_TOTAL).increment(batch.len() as u64);
                debug!(keys = %label, "cache keys invalidated");
            } else {
                complete = false;
            }
        }
        complete
    }
}

fn describe_batch(batch: &[String]) -> String {
    match batch {
        [single] => single.clone(),
        _ => format!("{} keys", batch.len()),
    }
}

fn encode<T: Serialize + ?Sized>(key: &CacheKey, value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(key = %key, error = %err, "failed to serialize cache payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::cache::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        id: i64,
        name: String,
    }

    fn payload() -> Payload {
        Payload {
            id: 7,
            name: "Backend Engineer".to_string(),
        }
    }

    fn access(store: Arc<dyn KvStore>) -> CacheAccess {
        CacheAccess::new(store, CacheConfig::default())
    }

    /// Fails every call.
    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn delete(&self, _keys: &[String]) -> Result<(), StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn add_to_index(
            &self,
            _index: &str,
            _member: &str,
            _ttl: Duration,
            _max_members: u64,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn index_members(&self, _index: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
        async fn remove_from_index(
            &self,
            _index: &str,
            _members: &[String],
        ) -> Result<(), StoreError> {
            Err(StoreError::Transport("connection refused".into()))
        }
    }

    /// Never answers `get`; counts calls that reached it.
    #[derive(Default)]
    struct StalledStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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
        async fn remove_from_index(
            &self,
            _index: &str,
            _members: &[String],
        ) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    /// Delegates to a [`MemoryStore`]; can fail `index_members` on demand and
    /// records the size of every `delete` batch.
    #[derive(Default)]
    struct InstrumentedStore {
        inner: MemoryStore,
        failing_member_reads: AtomicUsize,
        delete_batches: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl KvStore for InstrumentedStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            self.inner.set(key, value, ttl).await
        }
        async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
            self.delete_batches.lock().unwrap().push(keys.len());
            self.inner.delete(keys).await
        }
        async fn add_to_index(
            &self,
            index: &str,
            member: &str,
            ttl: Duration,
            max_members: u64,
        ) -> Result<bool, StoreError> {
            self.inner.add_to_index(index, member, ttl, max_members).await
        }
        async fn index_members(&self, index: &str) -> Result<Vec<String>, StoreError> {
            let failing = self
                .failing_member_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Transport("connection reset".into()));
            }
            self.inner.index_members(index).await
        }
        async fn remove_from_index(
            &self,
            index: &str,
            members: &[String],
        ) -> Result<(), StoreError> {
            self.inner.remove_from_index(index, members).await
        }
    }

    fn listing_page(page: u32) -> CacheKey {
        CacheKey::job_list(&crate::cache::JobListQuery {
            page: crate::application::pagination::PageRequest::new(Some(page), None),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = access(Arc::new(MemoryStore::new()));
        let key = CacheKey::job(7);
        cache.set(&key, &payload(), None).await;
        assert_eq!(cache.get::<Payload>(&key).await, Some(payload()));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_with_one_second_ttl_expires() {
        let cache = access(Arc::new(MemoryStore::new()));
        let key = CacheKey::job(1);
        cache
            .set(&key, &payload(), Some(Duration::from_secs(1)))
            .await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(cache.get::<Payload>(&key).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn default_ttl_applies_when_none_given() {
        let cache = access(Arc::new(MemoryStore::new()));
        let key = CacheKey::job(2);
        cache.set(&key, &payload(), None).await;

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(cache.get::<Payload>(&key).await.is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get::<Payload>(&key).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("job:3", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = access(store);
        assert_eq!(cache.get::<Payload>(&CacheKey::job(3)).await, None);
    }

    #[tokio::test]
    async fn failing_store_degrades_silently() {
        let cache = access(Arc::new(BrokenStore));
        let key = CacheKey::job(4);
        cache.set(&key, &payload(), None).await;
        cache.delete(&key).await;
        cache.invalidate_bucket(CacheBucket::JobListings).await;
        assert_eq!(cache.get::<Payload>(&key).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out_as_miss() {
        let store = Arc::new(StalledStore::default());
        let cache = access(store.clone());
        let started = tokio::time::Instant::now();
        assert_eq!(cache.get::<Payload>(&CacheKey::job(5)).await, None);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn disabled_cache_never_touches_store() {
        let store = Arc::new(StalledStore::default());
        let cache = CacheAccess::new(
            store.clone(),
            CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        );
        assert_eq!(cache.get::<Payload>(&CacheKey::job(6)).await, None);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(!CacheAccess::disabled().is_enabled());
    }

    #[tokio::test]
    async fn bucket_invalidation_removes_root_and_composites() {
        let store = Arc::new(MemoryStore::new());
        let cache = access(store.clone());
        let bucket = CacheBucket::JobListings;
        let root = CacheKey::jobs_all();
        let page_two = listing_page(2);
        let detail = CacheKey::job(9);

        cache.set_in_bucket(bucket, &root, &vec![payload()], None).await;
        cache.set_in_bucket(bucket, &page_two, &vec![payload()], None).await;
        cache.set(&detail, &payload(), None).await;
        assert_eq!(
            store.index_members("jobs:all:index").await.unwrap(),
            vec![page_two.to_string()]
        );

        cache.invalidate_bucket(bucket).await;

        assert_eq!(cache.get::<Vec<Payload>>(&root).await, None);
        assert_eq!(cache.get::<Vec<Payload>>(&page_two).await, None);
        assert!(store.index_members("jobs:all:index").await.unwrap().is_empty());
        assert_eq!(cache.get::<Payload>(&detail).await, Some(payload()));
    }

    #[tokio::test]
    async fn unreadable_index_is_kept_for_the_next_invalidation() {
        let store = Arc::new(InstrumentedStore::default());
        let cache = access(store.clone());
        let bucket = CacheBucket::JobListings;
        let root = CacheKey::jobs_all();
        let page_two = listing_page(2);

        cache.set_in_bucket(bucket, &root, &vec![payload()], None).await;
        cache.set_in_bucket(bucket, &page_two, &vec![payload()], None).await;

        store.failing_member_reads.store(1, Ordering::SeqCst);
        cache.invalidate_bucket(bucket).await;
        assert_eq!(cache.get::<Vec<Payload>>(&root).await, None);
        assert_eq!(
            store.inner.index_members("jobs:all:index").await.unwrap(),
            vec![page_two.to_string()]
        );

        cache.invalidate_bucket(bucket).await;
        assert_eq!(cache.get::<Vec<Payload>>(&page_two).await, None);
        assert!(store.inner.index_members("jobs:all:index").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_index_stops_caching_new_listings() {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheAccess::new(
            store.clone(),
            CacheConfig {
                max_listing_keys: 2,
                ..CacheConfig::default()
            },
        );
        let bucket = CacheBucket::JobListings;
        for page in 2..=4 {
            cache.set_in_bucket(bucket, &listing_page(page), &vec![payload()], None).await;
        }

        assert_eq!(store.index_members("jobs:all:index").await.unwrap().len(), 2);
        assert!(cache.get::<Vec<Payload>>(&listing_page(3)).await.is_some());
        assert_eq!(cache.get::<Vec<Payload>>(&listing_page(4)).await, None);

        cache.invalidate_bucket(bucket).await;
        cache.set_in_bucket(bucket, &listing_page(4), &vec![payload()], None).await;
        assert!(cache.get::<Vec<Payload>>(&listing_page(4)).await.is_some());
    }

    #[tokio::test]
    async fn bucket_invalidation_deletes_in_batches() {
        let store = Arc::new(InstrumentedStore::default());
        let cache = CacheAccess::new(
            store.clone(),
            CacheConfig {
                max_listing_keys: 500,
                ..CacheConfig::default()
            },
        );
        let bucket = CacheBucket::JobListings;
        for page in 2..=251 {
            cache.set_in_bucket(bucket, &listing_page(page), &vec![payload()], None).await;
        }

        cache.invalidate_bucket(bucket).await;

        let batches = store.delete_batches.lock().unwrap().clone();
        assert_eq!(batches, vec![1, 100, 100, 50]);
        assert_eq!(cache.get::<Vec<Payload>>(&listing_page(251)).await, None);
        assert!(store.inner.index_members("jobs:all:index").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn index_outlives_the_listing_it_tracks() {
        let store = Arc::new(MemoryStore::new());
        let cache = access(store.clone());
        let page_two = listing_page(2);
        cache
            .set_in_bucket(
                CacheBucket::JobListings,
                &page_two,
                &vec![payload()],
                Some(Duration::from_secs(10)),
            )
            .await;

        tokio::time::advance(Duration::from_millis(10_500)).await;
        assert_eq!(cache.get::<Vec<Payload>>(&page_two).await, None);
        assert_eq!(
            store.index_members("jobs:all:index").await.unwrap(),
            vec![page_two.to_string()]
        );
    }

    #[tokio::test]
    async fn deleting_missing_key_is_fine() {
        let cache = access(Arc::new(MemoryStore::new()));
        cache.delete(&CacheKey::job(404)).await;
        assert_eq!(cache.get::<Payload>(&CacheKey::job(404)).await, None);
    }
}
