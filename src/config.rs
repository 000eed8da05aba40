//! Tunables for cache freshness, upstream load, and paging.

use crate::common;
use std::time::Duration;

/// Configuration for a [`crate::dex::Pokedex`] instance.
///
/// Defaults match the hand-tuned values the service runs with; `from_env`
/// allows the deployment to override the upstream endpoint and the entity TTL.
#[derive(Debug, Clone)]
pub struct DexConfig {
    /// Base URL of the upstream API, without a trailing slash.
    pub base_url: String,
    /// How long a cached single-entity payload stays fresh.
    pub entity_ttl_hours: u64,
    /// How long a built index snapshot stays fresh, in memory or persisted.
    pub index_ttl_hours: u64,
    /// How long the store gateway stays disabled after a connectivity failure.
    pub store_retry_backoff: Duration,
    /// Upstream requests in flight at once during a full index build.
    pub index_concurrency: usize,
    /// Upstream requests in flight at once when enriching a single listing page.
    pub listing_concurrency: usize,
    /// Items per page served to callers.
    pub page_size: u32,
    /// Items per request when paginating the upstream listing.
    pub api_page_size: u32,
    /// Hard cap on the collection size.
    pub max_count: u32,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            base_url: common::DEFAULT_BASE_URL.to_owned(),
            entity_ttl_hours: 24,
            index_ttl_hours: 6,
            store_retry_backoff: Duration::from_millis(300_000),
            index_concurrency: 40,
            listing_concurrency: 12,
            page_size: common::DEFAULT_PAGE_SIZE,
            api_page_size: 250,
            max_count: common::MAX_POKEMON_COUNT,
        }
    }
}

impl DexConfig {
    /// Defaults with `POKEAPI_BASE_URL` and `CACHE_TTL_HOURS` overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("POKEAPI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(hours) = std::env::var("CACHE_TTL_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
        {
            config.entity_ttl_hours = hours;
        }
        config
    }

    pub fn entity_ttl_secs(&self) -> i64 {
        self.entity_ttl_hours as i64 * 3600
    }

    pub fn index_ttl_secs(&self) -> i64 {
        self.index_ttl_hours as i64 * 3600
    }
}
