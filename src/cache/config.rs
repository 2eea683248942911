//! Cache configuration.
//!
//! Controls the remote listing cache via the `[cache]` table of `jobboard.toml`.

use std::time::Duration;

// Default values for cache configuration
const DEFAULT_TTL_SECONDS: u64 = 3600;
const DEFAULT_LISTING_TTL_SECONDS: u64 = 600;
const DEFAULT_TIMEOUT_MS: u64 = 500;
const DEFAULT_MAX_LISTING_KEYS: u64 = 1000;

/// Runtime cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether lookups and invalidations reach the store at all.
    pub enabled: bool,
    /// TTL applied to entries written without an explicit TTL.
    pub default_ttl_seconds: u64,
    /// TTL applied to listing pages populated on a miss.
    pub listing_ttl_seconds: u64,
    /// Upper bound on a single store round trip.
    pub timeout_ms: u64,
    /// Composite listing keys a bucket index may track; further listings are
    /// served uncached until the next invalidation.
    pub max_listing_keys: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            listing_ttl_seconds: DEFAULT_LISTING_TTL_SECONDS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_listing_keys: DEFAULT_MAX_LISTING_KEYS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled && settings.rest_url.is_some(),
            default_ttl_seconds: settings.default_ttl_seconds.get(),
            listing_ttl_seconds: settings.listing_ttl_seconds.get(),
            timeout_ms: settings.timeout_ms.get(),
            max_listing_keys: settings.max_listing_keys.get(),
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(1))
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_seconds.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
