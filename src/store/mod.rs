//! Durable key→JSON document store behind an availability gateway.
//!
//! The [`StoreBackend`] trait is the persistence seam; [`StoreGateway`] wraps
//! it so that connectivity failures degrade the whole cache layer to
//! "always fetch upstream" instead of bubbling errors into request handling.

pub mod error;

#[cfg(feature = "store-sqlite")]
pub mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteBackend;

use crate::common;
use async_trait::async_trait;
use error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One stored document with its last-write timestamp (unix seconds).
/// TTLs are evaluated against `updated_at` at read time only; nothing evicts
/// records in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub payload: serde_json::Value,
    pub updated_at: i64,
}

/// Key/value JSON document store.
///
/// Implementations must refresh `updated_at` on every upsert; the last writer
/// wins, with no per-record versioning beyond the timestamp.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch the document stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Insert or overwrite the document under `key`.
    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<(), StoreError>;
}

/// Availability wrapper around a [`StoreBackend`].
///
/// On a connectivity-class error the gateway flips itself unavailable and
/// records a retry deadline; until then every call short-circuits to a no-op
/// success (`get` → `Ok(None)`, `upsert` → `Ok(())`). Once the deadline
/// passes it optimistically re-attempts. Non-connectivity errors propagate
/// unchanged. Constructed with no backend at all, it short-circuits forever,
/// which is the "caching disabled" mode.
pub struct StoreGateway {
    backend: Option<Arc<dyn StoreBackend>>,
    retry_backoff: Duration,
    /// Unix millis until which the store is considered down; 0 = available.
    disabled_until_ms: AtomicI64,
}

impl StoreGateway {
    pub fn new(backend: Option<Arc<dyn StoreBackend>>, retry_backoff: Duration) -> Self {
        Self {
            backend,
            retry_backoff,
            disabled_until_ms: AtomicI64::new(0),
        }
    }

    /// Gateway that never persists anything.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_millis(0))
    }

    pub async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        if !self.ready() {
            return Ok(None);
        }
        match backend.get(key).await {
            Ok(record) => Ok(record),
            Err(err) if err.is_connectivity() => {
                self.disable(&err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<(), StoreError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        if !self.ready() {
            return Ok(());
        }
        match backend.upsert(key, payload).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_connectivity() => {
                self.disable(&err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn ready(&self) -> bool {
        let until = self.disabled_until_ms.load(Ordering::Relaxed);
        if until == 0 {
            return true;
        }
        if common::unix_millis() >= until {
            // Backoff elapsed; re-attempt the next real call.
            self.disabled_until_ms.store(0, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn disable(&self, err: &StoreError) {
        log::warn!(
            "[store] disabling cache for {:?} after connectivity failure: {err}",
            self.retry_backoff
        );
        let deadline = common::unix_millis() + self.retry_backoff.as_millis() as i64;
        self.disabled_until_ms.store(deadline, Ordering::Relaxed);
    }
}
