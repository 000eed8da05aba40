//! In-memory collaborators for exercising the cache paths without HTTP or a
//! real database.

use crate::pokeapi::error::ApiError;
use crate::pokeapi::types::{
    ChainLink, EncounterResponse, EvolutionChainResponse, NamedResource, PageResponse,
    PokemonResponse, ResourceRef, SpeciesResponse, SpriteSet, TypeSlot,
};
use crate::pokeapi::UpstreamSource;
use crate::store::error::StoreError;
use crate::store::{StoreBackend, StoredRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn named(name: &str, url: &str) -> NamedResource {
    NamedResource {
        name: name.to_owned(),
        url: url.to_owned(),
    }
}

/// A straight `a → b → c` evolution chain tree.
pub(crate) fn linear_chain(names: &[&str]) -> EvolutionChainResponse {
    let mut node: Option<ChainLink> = None;
    for name in names.iter().rev() {
        node = Some(ChainLink {
            species: named(name, ""),
            evolves_to: node.into_iter().collect(),
        });
    }
    EvolutionChainResponse {
        id: 1,
        chain: node.unwrap_or(ChainLink {
            species: named("", ""),
            evolves_to: Vec::new(),
        }),
    }
}

pub(crate) fn sample_pokemon(id: u32, name: &str, species: &str, types: &[&str]) -> PokemonResponse {
    PokemonResponse {
        id,
        name: name.to_owned(),
        height: Some(7),
        weight: Some(69),
        sprites: SpriteSet::default(),
        types: types
            .iter()
            .map(|t| TypeSlot {
                slot: 1,
                kind: named(t, ""),
            })
            .collect(),
        species: Some(named(
            species,
            &format!("https://pokeapi.invalid/api/v2/pokemon-species/{id}/"),
        )),
    }
}

/// Programmable [`UpstreamSource`] with per-operation call counters.
pub(crate) struct MockUpstream {
    pokemon: HashMap<String, PokemonResponse>,
    species: HashMap<String, SpeciesResponse>,
    chains: HashMap<String, EvolutionChainResponse>,
    roster: Vec<NamedResource>,
    /// Artificial latency for listing pages; lets tests overlap callers with
    /// an in-flight index build.
    pub page_delay: Option<Duration>,
    /// Number of upcoming `fetch_page` calls that should fail with a 500.
    pub failing_pages: AtomicUsize,
    pub pokemon_calls: AtomicUsize,
    pub species_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            pokemon: HashMap::new(),
            species: HashMap::new(),
            chains: HashMap::new(),
            roster: Vec::new(),
            page_delay: None,
            failing_pages: AtomicUsize::new(0),
            pokemon_calls: AtomicUsize::new(0),
            species_calls: AtomicUsize::new(0),
            page_calls: AtomicUsize::new(0),
        }
    }

    /// Registers one entity together with its species metadata and chain.
    /// `chain` lists the species of a linear chain from root to final form;
    /// an empty slice leaves the species without an evolution chain link.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        id: u32,
        name: &str,
        species: &str,
        types: &[&str],
        generation: Option<&str>,
        legendary: bool,
        chain: &[&str],
    ) {
        self.roster.push(named(
            name,
            &format!("https://pokeapi.invalid/api/v2/pokemon/{id}/"),
        ));
        self.pokemon
            .insert(name.to_owned(), sample_pokemon(id, name, species, types));

        let chain_url = chain
            .first()
            .map(|root| format!("https://pokeapi.invalid/api/v2/evolution-chain/{root}/"));
        let position = chain.iter().position(|entry| *entry == species);
        let evolves_from = match position {
            Some(p) if p > 0 => chain.get(p - 1).map(|prev| named(prev, "")),
            _ => None,
        };

        self.species.insert(
            species.to_owned(),
            SpeciesResponse {
                id,
                name: species.to_owned(),
                generation: generation.map(|g| named(g, "")),
                is_legendary: legendary,
                is_mythical: false,
                evolves_from_species: evolves_from,
                evolution_chain: chain_url.clone().map(|url| ResourceRef { url }),
                flavor_text_entries: Vec::new(),
            },
        );

        if let Some(url) = chain_url {
            self.chains
                .insert(url.trim_end_matches('/').to_owned(), linear_chain(chain));
        }
    }

    pub fn remove_species(&mut self, species: &str) {
        self.species.remove(species);
    }

    pub fn remove_chains(&mut self) {
        self.chains.clear();
    }
}

#[async_trait]
impl UpstreamSource for MockUpstream {
    async fn fetch_pokemon(&self, name: &str) -> Result<PokemonResponse, ApiError> {
        self.pokemon_calls.fetch_add(1, Ordering::SeqCst);
        self.pokemon
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(name.to_owned()))
    }

    async fn fetch_species(&self, name: &str) -> Result<SpeciesResponse, ApiError> {
        self.species_calls.fetch_add(1, Ordering::SeqCst);
        self.species
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(name.to_owned()))
    }

    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionChainResponse, ApiError> {
        self.chains
            .get(url.trim_end_matches('/'))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(url.to_owned()))
    }

    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PageResponse, ApiError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .failing_pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }

        let start = (offset as usize).min(self.roster.len());
        let end = (start + limit as usize).min(self.roster.len());
        let next = if end < self.roster.len() {
            Some("next".to_owned())
        } else {
            None
        };
        Ok(PageResponse {
            count: self.roster.len() as u32,
            next,
            previous: None,
            results: self.roster[start..end].to_vec(),
        })
    }

    async fn fetch_encounters(&self, _name: &str) -> Result<Vec<EncounterResponse>, ApiError> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum FailMode {
    Connectivity,
    Logical,
}

/// Programmable [`StoreBackend`] with call counters and a switchable failure
/// mode.
pub(crate) struct MockStore {
    pub records: Mutex<HashMap<String, StoredRecord>>,
    fail: Mutex<Option<FailMode>>,
    pub get_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            fail: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, key: &str, payload: serde_json::Value, updated_at: i64) {
        self.records.lock().unwrap().insert(
            key.to_owned(),
            StoredRecord {
                payload,
                updated_at,
            },
        );
    }

    pub fn set_fail(&self, mode: Option<FailMode>) {
        *self.fail.lock().unwrap() = mode;
    }

    fn failure(&self) -> Option<StoreError> {
        match *self.fail.lock().unwrap() {
            Some(FailMode::Connectivity) => {
                Some(StoreError::Connectivity("connection refused".to_owned()))
            }
            Some(FailMode::Logical) => {
                let decode_err = serde_json::from_str::<serde_json::Value>("not json")
                    .expect_err("invalid json must not parse");
                Some(StoreError::Decode(decode_err))
            }
            None => None,
        }
    }
}

#[async_trait]
impl StoreBackend for MockStore {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.seed(key, payload.clone(), crate::common::unix_seconds());
        Ok(())
    }
}
