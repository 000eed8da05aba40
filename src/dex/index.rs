//! TTL cache of the full index with single-flight rebuild coordination.
//!
//! A rebuild paginates and enriches the entire upstream collection, which can
//! take minutes; the coordinator guarantees at most one rebuild runs at a
//! time and every concurrent caller shares its result.

use crate::common;
use crate::config::DexConfig;
use crate::dex::builder::IndexBuilder;
use crate::dex::entity::PokemonEntry;
use crate::dex::error::DexError;
use crate::pokeapi::UpstreamSource;
use crate::store::StoreGateway;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Reserved store key under which the serialized index array lives.
pub const INDEX_CACHE_KEY: &str = "__pokedex_index__";

type SharedBuild = Shared<BoxFuture<'static, Result<Arc<Vec<PokemonEntry>>, Arc<DexError>>>>;

/// Process-local copy of the index. Never mutated in place; a rebuild
/// produces a whole new snapshot that replaces the reference.
#[derive(Clone)]
struct IndexSnapshot {
    items: Arc<Vec<PokemonEntry>>,
    built_at: i64,
}

/// Owns all mutable index state: the in-memory snapshot and the in-flight
/// build handle. Constructed once per process and shared by reference.
#[derive(Clone)]
pub struct IndexCache {
    inner: Arc<Inner>,
}

struct Inner {
    upstream: Arc<dyn UpstreamSource>,
    store: Arc<StoreGateway>,
    config: DexConfig,
    snapshot: RwLock<Option<IndexSnapshot>>,
    building: Mutex<Option<SharedBuild>>,
}

impl IndexCache {
    pub fn new(
        upstream: Arc<dyn UpstreamSource>,
        store: Arc<StoreGateway>,
        config: DexConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                upstream,
                store,
                config,
                snapshot: RwLock::new(None),
                building: Mutex::new(None),
            }),
        }
    }

    /// Returns the freshest available index.
    ///
    /// Resolution order: fresh in-memory snapshot, then a fresh persisted copy
    /// from the durable store, then joining an in-flight rebuild, then
    /// starting one. A failed build propagates to every waiter and installs
    /// nothing, so the next call starts over.
    pub async fn get_index(&self) -> Result<Arc<Vec<PokemonEntry>>, DexError> {
        if let Some(items) = self.inner.fresh_snapshot() {
            return Ok(items);
        }
        if let Some(items) = self.inner.hydrate_from_store().await {
            return Ok(items);
        }
        let build = self.inner.clone().join_or_start_build().await;
        build.await.map_err(DexError::Build)
    }
}

impl Inner {
    fn fresh_snapshot(&self) -> Option<Arc<Vec<PokemonEntry>>> {
        let guard = self.snapshot.read().unwrap();
        let snapshot = guard.as_ref()?;
        if common::unix_seconds() - snapshot.built_at < self.config.index_ttl_secs() {
            Some(snapshot.items.clone())
        } else {
            None
        }
    }

    fn install_snapshot(&self, items: Arc<Vec<PokemonEntry>>, built_at: i64) {
        *self.snapshot.write().unwrap() = Some(IndexSnapshot { items, built_at });
    }

    /// Adopts a recently persisted index, avoiding a rebuild after a process
    /// restart as long as some other run built one inside the TTL.
    async fn hydrate_from_store(&self) -> Option<Arc<Vec<PokemonEntry>>> {
        let record = match self.store.get(INDEX_CACHE_KEY).await {
            Ok(record) => record?,
            Err(err) => {
                log::warn!("[index] could not load persisted index: {err}");
                return None;
            }
        };
        if common::unix_seconds() - record.updated_at >= self.config.index_ttl_secs() {
            return None;
        }

        let mut items: Vec<PokemonEntry> = match serde_json::from_value(record.payload) {
            Ok(items) => items,
            Err(err) => {
                log::warn!("[index] persisted index is malformed, rebuilding: {err}");
                return None;
            }
        };
        items.sort_by_key(|entry| entry.id);

        let items = Arc::new(items);
        self.install_snapshot(items.clone(), record.updated_at);
        Some(items)
    }

    /// Joins the in-flight build if one exists, otherwise starts one. The
    /// shared future keeps rebuild concurrency at exactly one regardless of
    /// how many callers arrive while it runs.
    async fn join_or_start_build(self: Arc<Self>) -> SharedBuild {
        let mut guard = self.building.lock().await;
        if let Some(build) = guard.as_ref() {
            return build.clone();
        }

        let inner = self.clone();
        let build: SharedBuild = async move {
            let result = inner.build_and_install().await.map_err(Arc::new);
            *inner.building.lock().await = None;
            result
        }
        .boxed()
        .shared();

        *guard = Some(build.clone());
        build
    }

    async fn build_and_install(&self) -> Result<Arc<Vec<PokemonEntry>>, DexError> {
        let builder = IndexBuilder::new(self.upstream.clone(), self.config.clone());
        let items = Arc::new(builder.build().await?);
        self.install_snapshot(items.clone(), common::unix_seconds());
        self.persist(&items).await;
        Ok(items)
    }

    /// Best-effort persist: a failed write never fails the build.
    async fn persist(&self, items: &Arc<Vec<PokemonEntry>>) {
        let payload = match serde_json::to_value(items.as_ref()) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("[index] could not serialize index for persistence: {err}");
                return;
            }
        };
        if let Err(err) = self.store.upsert(INDEX_CACHE_KEY, &payload).await {
            log::warn!("[index] could not persist index: {err}");
        }
    }
}
