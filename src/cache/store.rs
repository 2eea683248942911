//! Key-value store client contract and the in-process implementation.
//!
//! The production store is remote ([`super::UpstashStore`]); [`MemoryStore`]
//! backs tests and local development.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store rejected command: {0}")]
    Command(String),
    #[error("unexpected store response: {0}")]
    Protocol(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// A remote TTL-capable key-value store.
///
/// Every call may fail or stall; callers go through
/// [`super::CacheAccess`], which bounds and absorbs both.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Deleting absent keys succeeds.
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Atomically add `member` to the set at `index` and (re)arm its expiry.
    ///
    /// Returns `false` without touching the set when `member` is new and the
    /// set already holds `max_members` entries.
    async fn add_to_index(
        &self,
        index: &str,
        member: &str,
        ttl: Duration,
        max_members: u64,
    ) -> Result<bool, StoreError>;

    async fn index_members(&self, index: &str) -> Result<Vec<String>, StoreError>;

    /// Removing absent members succeeds.
    async fn remove_from_index(&self, index: &str, members: &[String]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process store honouring TTLs against the tokio clock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry at `key` if it has expired and return whether one is live.
    fn purge_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove_if(key, |_, entry| !entry.is_live(now));
        self.entries.contains_key(key)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Command(format!(
        "WRONGTYPE operation against key `{key}` holding the wrong kind of value"
    ))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.purge_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key).map(|entry| entry.value.clone()) {
            Some(StoredValue::Text(value)) => Ok(Some(value)),
            Some(StoredValue::Set(_)) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::Text(value.to_string()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn add_to_index(
        &self,
        index: &str,
        member: &str,
        ttl: Duration,
        max_members: u64,
    ) -> Result<bool, StoreError> {
        self.purge_expired(index);
        let expires_at = Instant::now() + ttl;
        let mut entry = self.entries.entry(index.to_string()).or_insert_with(|| Entry {
            value: StoredValue::Set(BTreeSet::new()),
            expires_at,
        });
        match &mut entry.value {
            StoredValue::Set(members) => {
                if !members.contains(member) {
                    if members.len() as u64 >= max_members {
                        return Ok(false);
                    }
                    members.insert(member.to_string());
                }
            }
            StoredValue::Text(_) => return Err(wrong_type(index)),
        }
        entry.expires_at = expires_at;
        Ok(true)
    }

    async fn index_members(&self, index: &str) -> Result<Vec<String>, StoreError> {
        if !self.purge_expired(index) {
            return Ok(Vec::new());
        }
        match self.entries.get(index).map(|entry| entry.value.clone()) {
            Some(StoredValue::Set(members)) => Ok(members.into_iter().collect()),
            Some(StoredValue::Text(_)) => Err(wrong_type(index)),
            None => Ok(Vec::new()),
        }
    }

    async fn remove_from_index(&self, index: &str, members: &[String]) -> Result<(), StoreError> {
        if !self.purge_expired(index) {
            return Ok(());
        }
        if let Some(mut entry) = self.entries.get_mut(index) {
            match &mut entry.value {
                StoredValue::Set(set) => {
                    for member in members {
                        set.remove(member);
                    }
                }
                StoredValue::Text(_) => return Err(wrong_type(index)),
            }
        }
        self.entries.remove_if(index, |_, entry| {
            matches!(&entry.value, StoredValue::Set(set) if set.is_empty())
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("job:1", "{}", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.get("job:1").await.unwrap().as_deref(), Some("{}"));

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(store.get("job:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_absent_keys_succeeds() {
        let store = MemoryStore::new();
        store
            .delete(&["missing".to_string(), "also-missing".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set("k", "one", ttl).await.unwrap();
        store.set("k", "two", ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn index_collects_members_and_rearms_expiry() {
        let store = MemoryStore::new();
        assert!(
            store
                .add_to_index("idx", "a", Duration::from_secs(2), 10)
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(
            store
                .add_to_index("idx", "b", Duration::from_secs(2), 10)
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(store.index_members("idx").await.unwrap(), vec!["a", "b"]);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.index_members("idx").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_index_rejects_new_members_only() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(10);
        assert!(store.add_to_index("idx", "a", ttl, 2).await.unwrap());
        assert!(store.add_to_index("idx", "b", ttl, 2).await.unwrap());
        assert!(!store.add_to_index("idx", "c", ttl, 2).await.unwrap());

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.add_to_index("idx", "a", ttl, 2).await.unwrap());
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(store.index_members("idx").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn removing_members_keeps_the_rest() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(10);
        for member in ["a", "b", "c"] {
            store.add_to_index("idx", member, ttl, 10).await.unwrap();
        }
        store
            .remove_from_index("idx", &["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(store.index_members("idx").await.unwrap(), vec!["b", "c"]);

        store
            .remove_from_index("idx", &["b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert!(store.index_members("idx").await.unwrap().is_empty());
        store.remove_from_index("gone", &["x".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn reading_a_set_as_text_is_an_error() {
        let store = MemoryStore::new();
        store
            .add_to_index("idx", "a", Duration::from_secs(5), 10)
            .await
            .unwrap();
        assert!(matches!(
            store.get("idx").await,
            Err(StoreError::Command(_))
        ));
    }
}
