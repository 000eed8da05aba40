//! Full index construction: paginate the whole collection, enrich every
//! entity with species and evolution metadata, deduplicate regional variants
//! by species identity, and sort canonically.

use crate::common;
use crate::config::DexConfig;
use crate::dex::batch::map_batches;
use crate::dex::entity::{EvolutionStage, PokemonEntry};
use crate::dex::error::DexError;
use crate::pokeapi::types::{
    ChainLink, EvolutionChainResponse, NamedResource, PokemonResponse, SpeciesResponse,
};
use crate::pokeapi::UpstreamSource;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Evolution attributes derived from a species' chain.
#[derive(Debug, Clone)]
pub struct EvolutionMetadata {
    pub stage: EvolutionStage,
    pub evolves_from: Option<String>,
}

impl EvolutionMetadata {
    fn base(species: &SpeciesResponse) -> Self {
        Self {
            stage: EvolutionStage::Base,
            evolves_from: species.evolves_from_species.as_ref().map(|s| s.name.clone()),
        }
    }
}

/// One full-index build run.
///
/// Holds the species-dedup set and a chain memo for the duration of a single
/// build; a fresh builder is constructed per rebuild so no state leaks
/// between runs.
pub struct IndexBuilder {
    upstream: Arc<dyn UpstreamSource>,
    config: DexConfig,
    seen_species: Mutex<HashSet<String>>,
    chain_memo: Mutex<HashMap<String, Arc<EvolutionChainResponse>>>,
}

impl IndexBuilder {
    pub fn new(upstream: Arc<dyn UpstreamSource>, config: DexConfig) -> Self {
        Self {
            upstream,
            config,
            seen_species: Mutex::new(HashSet::new()),
            chain_memo: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the complete index, sorted ascending by id.
    ///
    /// Individual enrichment failures are logged and shrink the result;
    /// a failure to paginate the listing aborts the whole build.
    pub async fn build(&self) -> Result<Vec<PokemonEntry>, DexError> {
        let names = self.collect_names().await?;
        log::debug!("[index] building index over {} names", names.len());

        let enriched = map_batches(names, self.config.index_concurrency, |name| async move {
            self.index_one(name).await
        })
        .await;

        let mut entries: Vec<PokemonEntry> = enriched.into_iter().flatten().collect();
        entries.sort_by_key(|entry| entry.id);
        Ok(entries)
    }

    /// Retrieves the ordered name list for the whole collection, following
    /// the listing cursor until it runs out or the collection cap is hit.
    async fn collect_names(&self) -> Result<Vec<String>, DexError> {
        let mut names = Vec::with_capacity(self.config.max_count as usize);
        let mut offset = 0u32;

        loop {
            let page = self
                .upstream
                .fetch_page(offset, self.config.api_page_size)
                .await?;
            let got = page.results.len() as u32;
            names.extend(page.results.into_iter().map(|entry| entry.name));

            if got == 0 || page.next.is_none() || names.len() >= self.config.max_count as usize {
                break;
            }
            offset += got;
        }

        names.truncate(self.config.max_count as usize);
        Ok(names)
    }

    async fn index_one(&self, name: String) -> Option<PokemonEntry> {
        match self.enrich(&name).await {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("[index] dropping {name}: {err}");
                None
            }
        }
    }

    async fn enrich(&self, name: &str) -> Result<Option<PokemonEntry>, DexError> {
        let detail = self.upstream.fetch_pokemon(name).await?;
        let species_name = detail
            .species
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| detail.name.clone());

        // First variant to claim a species wins; upstream ordering makes that
        // the lowest id.
        {
            let mut seen = self.seen_species.lock().unwrap();
            if !seen.insert(species_name.clone()) {
                return Ok(None);
            }
        }

        let species = self.upstream.fetch_species(&species_name).await?;
        let evolution = self.resolve_evolution(&species).await;
        Ok(Some(build_entry(&detail, &species, &evolution)))
    }

    /// Like [`resolve_evolution`], but memoizes chain fetches across the
    /// build, since every species of one chain shares the same tree.
    async fn resolve_evolution(&self, species: &SpeciesResponse) -> EvolutionMetadata {
        let Some(chain_ref) = &species.evolution_chain else {
            return EvolutionMetadata::base(species);
        };
        match self.fetch_chain(&chain_ref.url).await {
            Ok(chain) => EvolutionMetadata {
                stage: EvolutionStage::from_depth(chain_depth(&chain.chain, &species.name, 0)),
                evolves_from: species.evolves_from_species.as_ref().map(|s| s.name.clone()),
            },
            Err(err) => {
                log::warn!("[index] evolution chain unavailable for {}: {err}", species.name);
                EvolutionMetadata::base(species)
            }
        }
    }

    async fn fetch_chain(&self, url: &str) -> Result<Arc<EvolutionChainResponse>, DexError> {
        let key = url.trim_end_matches('/').to_owned();
        if let Some(chain) = self.chain_memo.lock().unwrap().get(&key).cloned() {
            return Ok(chain);
        }
        let chain = Arc::new(self.upstream.fetch_evolution_chain(url).await?);
        self.chain_memo.lock().unwrap().insert(key, chain.clone());
        Ok(chain)
    }
}

/// Depth of `target` inside an evolution chain tree, or -1 when absent.
pub fn chain_depth(node: &ChainLink, target: &str, depth: i32) -> i32 {
    if node.species.name == target {
        return depth;
    }
    for child in &node.evolves_to {
        let found = chain_depth(child, target, depth + 1);
        if found != -1 {
            return found;
        }
    }
    -1
}

/// Resolves evolution metadata for one species without a build-wide memo.
/// Chain fetch failures degrade to the base stage rather than failing.
pub async fn resolve_evolution(
    upstream: &dyn UpstreamSource,
    species: &SpeciesResponse,
) -> EvolutionMetadata {
    let Some(chain_ref) = &species.evolution_chain else {
        return EvolutionMetadata::base(species);
    };
    match upstream.fetch_evolution_chain(&chain_ref.url).await {
        Ok(chain) => EvolutionMetadata {
            stage: EvolutionStage::from_depth(chain_depth(&chain.chain, &species.name, 0)),
            evolves_from: species.evolves_from_species.as_ref().map(|s| s.name.clone()),
        },
        Err(err) => {
            log::warn!("[list] evolution chain unavailable for {}: {err}", species.name);
            EvolutionMetadata::base(species)
        }
    }
}

/// Assembles the denormalized index entry from its already-fetched parts.
pub fn build_entry(
    detail: &PokemonResponse,
    species: &SpeciesResponse,
    evolution: &EvolutionMetadata,
) -> PokemonEntry {
    PokemonEntry {
        id: detail.id,
        name: detail.name.clone(),
        sprite: sprite_url(detail),
        types: detail.types.iter().map(|slot| slot.kind.name.clone()).collect(),
        generation: species.generation.as_ref().map(|g| g.name.clone()),
        is_legendary: species.is_legendary || species.is_mythical,
        evolution_stage: evolution.stage,
        evolves_from: evolution.evolves_from.clone(),
    }
}

/// Enriches one already-fetched detail record, degrading to the minimal shape
/// when species metadata cannot be fetched.
pub async fn enrich_detail(upstream: &dyn UpstreamSource, detail: &PokemonResponse) -> PokemonEntry {
    let species_name = detail
        .species
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or(detail.name.as_str());

    match upstream.fetch_species(species_name).await {
        Ok(species) => {
            let evolution = resolve_evolution(upstream, &species).await;
            build_entry(detail, &species, &evolution)
        }
        Err(err) => {
            log::warn!("[list] could not enrich {}: {err}", detail.name);
            degraded_entry(detail)
        }
    }
}

/// Minimal shape built from the detail record alone.
pub fn degraded_entry(detail: &PokemonResponse) -> PokemonEntry {
    PokemonEntry {
        id: detail.id,
        name: detail.name.clone(),
        sprite: sprite_url(detail),
        types: detail.types.iter().map(|slot| slot.kind.name.clone()).collect(),
        generation: None,
        is_legendary: false,
        evolution_stage: EvolutionStage::Base,
        evolves_from: None,
    }
}

/// Minimal shape built from a bare listing row, when even the detail fetch
/// failed. The id comes out of the resource URL.
pub fn fallback_entry(result: &NamedResource) -> PokemonEntry {
    let id = common::extract_resource_id(&result.url).unwrap_or(0);
    PokemonEntry {
        id,
        name: result.name.clone(),
        sprite: artwork_url(id),
        types: Vec::new(),
        generation: None,
        is_legendary: false,
        evolution_stage: EvolutionStage::Base,
        evolves_from: None,
    }
}

fn sprite_url(detail: &PokemonResponse) -> String {
    detail
        .sprites
        .other
        .get("official-artwork")
        .and_then(|variant| variant.front_default.clone())
        .or_else(|| detail.sprites.front_default.clone())
        .unwrap_or_else(|| artwork_url(detail.id))
}

fn artwork_url(id: u32) -> String {
    format!("{}/{id}.png", common::OFFICIAL_ARTWORK_URL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::testutil::{linear_chain, MockUpstream};

    #[test]
    fn chain_depth_walks_a_three_level_chain() {
        let chain = linear_chain(&["pichu", "pikachu", "raichu"]);
        assert_eq!(chain_depth(&chain.chain, "pichu", 0), 0);
        assert_eq!(chain_depth(&chain.chain, "pikachu", 0), 1);
        assert_eq!(chain_depth(&chain.chain, "raichu", 0), 2);
        assert_eq!(chain_depth(&chain.chain, "mewtwo", 0), -1);
    }

    #[test]
    fn stage_fallback_for_species_absent_from_chain() {
        assert_eq!(EvolutionStage::from_depth(-1), EvolutionStage::Base);
        assert_eq!(EvolutionStage::from_depth(0), EvolutionStage::Base);
        assert_eq!(EvolutionStage::from_depth(1), EvolutionStage::Stage1);
        assert_eq!(EvolutionStage::from_depth(4), EvolutionStage::Stage2);
    }

    #[tokio::test]
    async fn build_enriches_dedups_and_sorts() {
        let mut upstream = MockUpstream::new();
        upstream.add(25, "pikachu", "pikachu", &["electric"], Some("generation-i"), false, &["pichu", "pikachu", "raichu"]);
        upstream.add(1, "bulbasaur", "bulbasaur", &["grass", "poison"], Some("generation-i"), false, &["bulbasaur", "ivysaur", "venusaur"]);
        upstream.add(150, "mewtwo", "mewtwo", &["psychic"], Some("generation-i"), true, &["mewtwo"]);
        // Regional variant: same species, higher id, listed after the original.
        upstream.add(10025, "pikachu-alola", "pikachu", &["electric"], Some("generation-i"), false, &["pichu", "pikachu", "raichu"]);

        let builder = IndexBuilder::new(Arc::new(upstream), DexConfig::default());
        let index = builder.build().await.unwrap();

        let ids: Vec<u32> = index.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 25, 150]);

        let pikachu = &index[1];
        assert_eq!(pikachu.name, "pikachu");
        assert_eq!(pikachu.evolution_stage, EvolutionStage::Stage1);
        assert_eq!(pikachu.evolves_from.as_deref(), Some("pichu"));
        assert_eq!(pikachu.types, vec!["electric"]);

        assert!(index[2].is_legendary);
        assert_eq!(index[2].evolution_stage, EvolutionStage::Base);
    }

    #[tokio::test]
    async fn species_fetch_failure_drops_only_that_entry() {
        let mut upstream = MockUpstream::new();
        upstream.add(1, "bulbasaur", "bulbasaur", &["grass"], Some("generation-i"), false, &["bulbasaur"]);
        upstream.add(25, "pikachu", "pikachu", &["electric"], Some("generation-i"), false, &["pikachu"]);
        upstream.remove_species("pikachu");

        let builder = IndexBuilder::new(Arc::new(upstream), DexConfig::default());
        let index = builder.build().await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index[0].name, "bulbasaur");
    }

    #[tokio::test]
    async fn chain_failure_degrades_stage_to_base() {
        let mut upstream = MockUpstream::new();
        upstream.add(25, "pikachu", "pikachu", &["electric"], Some("generation-i"), false, &["pichu", "pikachu", "raichu"]);
        upstream.remove_chains();

        let builder = IndexBuilder::new(Arc::new(upstream), DexConfig::default());
        let index = builder.build().await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index[0].evolution_stage, EvolutionStage::Base);
        // The predecessor still comes from the species record itself.
        assert_eq!(index[0].evolves_from.as_deref(), Some("pichu"));
    }

    #[tokio::test]
    async fn collect_names_follows_cursor_and_honors_cap() {
        let mut upstream = MockUpstream::new();
        for id in 1..=9 {
            let name = format!("mon-{id}");
            upstream.add(id, &name, &name, &["normal"], None, false, &[]);
        }

        let config = DexConfig {
            api_page_size: 4,
            max_count: 6,
            ..DexConfig::default()
        };
        let upstream = Arc::new(upstream);
        let builder = IndexBuilder::new(upstream.clone(), config);
        let names = builder.collect_names().await.unwrap();

        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "mon-1");
        assert_eq!(names[5], "mon-6");
        // Two pages of four are enough to reach the cap of six.
        assert_eq!(upstream.page_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fallback_entry_extracts_id_from_url() {
        let result = NamedResource {
            name: "pikachu".to_owned(),
            url: "https://pokeapi.co/api/v2/pokemon/25/".to_owned(),
        };
        let entry = fallback_entry(&result);
        assert_eq!(entry.id, 25);
        assert_eq!(entry.name, "pikachu");
        assert!(entry.types.is_empty());
        assert!(entry.sprite.ends_with("/25.png"));
    }
}
