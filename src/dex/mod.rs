//! The dex service: read-through entity cache, full-index listings with
//! filtering and pagination, and profile lookups.

pub mod batch;
pub mod builder;
pub mod entity;
pub mod error;
pub mod index;

#[cfg(test)]
pub(crate) mod testutil;

use crate::common;
use crate::config::DexConfig;
use crate::pokeapi::types::{
    EncounterResponse, PageResponse, PokemonResponse, SpeciesResponse, SpriteSet,
};
use crate::pokeapi::{PokeApiClient, UpstreamSource};
use crate::store::{StoreBackend, StoreGateway};
use batch::map_batches;
use entity::{slice_page, total_pages, EvolutionStage, Filters, LegendaryKind, ListPage, PokemonEntry};
use error::DexError;
use index::IndexCache;
use serde::Serialize;
use std::sync::Arc;

/// Detail view payload: the cached entity plus display-oriented extras.
#[derive(Debug, Clone)]
pub struct Profile {
    pub pokemon: PokemonResponse,
    pub flavor_text: Option<String>,
    pub encounter_locations: Vec<String>,
    pub sprite_gallery: Vec<SpriteGalleryEntry>,
}

/// One named variant of the profile's sprite gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpriteGalleryEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub url: String,
}

/// Front door of the crate.
///
/// Owns the upstream client, the durable store gateway, and the index cache
/// coordinator; constructed once per process and shared by reference. All
/// mutable cache state lives in those fields, not in globals.
pub struct Pokedex {
    upstream: Arc<dyn UpstreamSource>,
    store: Arc<StoreGateway>,
    index: IndexCache,
    config: DexConfig,
}

impl Pokedex {
    /// A Pokédex over the real upstream API and an optional durable store;
    /// `None` disables persistence entirely.
    pub fn new(config: DexConfig, backend: Option<Arc<dyn StoreBackend>>) -> Self {
        let upstream: Arc<dyn UpstreamSource> = Arc::new(PokeApiClient::new(&config.base_url));
        Self::with_upstream(upstream, backend, config)
    }

    /// A Pokédex over custom collaborators. The main seam for tests.
    pub fn with_upstream(
        upstream: Arc<dyn UpstreamSource>,
        backend: Option<Arc<dyn StoreBackend>>,
        config: DexConfig,
    ) -> Self {
        let store = Arc::new(StoreGateway::new(backend, config.store_retry_backoff));
        let index = IndexCache::new(upstream.clone(), store.clone(), config.clone());
        Self {
            upstream,
            store,
            index,
            config,
        }
    }

    /// Read-through single-entity lookup.
    ///
    /// The durable store is consulted first; a record younger than the entity
    /// TTL is served without any upstream call. Otherwise the entity is
    /// fetched fresh and written back best-effort: a failed persist is logged
    /// and never fails the read.
    pub async fn get_entity(&self, name: &str) -> Result<PokemonResponse, DexError> {
        let key = name.trim().to_lowercase();

        if let Some(record) = self.store.get(&key).await? {
            if common::unix_seconds() - record.updated_at < self.config.entity_ttl_secs() {
                match serde_json::from_value(record.payload) {
                    Ok(detail) => return Ok(detail),
                    Err(err) => {
                        log::warn!("[entity] cached payload for {key} is malformed: {err}")
                    }
                }
            }
        }

        let detail = self.upstream.fetch_pokemon(&key).await?;

        match serde_json::to_value(&detail) {
            Ok(payload) => {
                if let Err(err) = self.store.upsert(&key, &payload).await {
                    log::warn!("[entity] could not persist {key}: {err}");
                }
            }
            Err(err) => log::warn!("[entity] could not serialize {key}: {err}"),
        }

        Ok(detail)
    }

    /// Lists one page of entities.
    ///
    /// A non-empty `query` short-circuits to an exact-name lookup. Otherwise
    /// filters run against the full index; with neither, the index is still
    /// preferred for cheap slicing, falling back to direct upstream
    /// pagination only when it is unavailable.
    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        query: Option<&str>,
        filters: &Filters,
    ) -> Result<ListPage, DexError> {
        let query = query.map(str::trim).unwrap_or("").to_lowercase();
        let filters_applied = !filters.is_empty();

        if !query.is_empty() {
            return self.search_one(&query, filters, filters_applied).await;
        }

        if filters_applied {
            let index = self.index.get_index().await?;
            let matched: Vec<PokemonEntry> = index
                .iter()
                .filter(|entry| filters.matches(entry))
                .cloned()
                .collect();
            let total = matched.len();
            let (items, page, pages) = slice_page(&matched, total, page, page_size);
            return Ok(ListPage {
                items,
                total,
                page,
                page_size,
                total_pages: pages,
                is_search: false,
                filters_applied: true,
            });
        }

        match self.index.get_index().await {
            Ok(index) => {
                let total = index.len().min(self.config.max_count as usize);
                if total > 0 {
                    let (items, page, pages) = slice_page(&index[..total], total, page, page_size);
                    return Ok(ListPage {
                        items,
                        total,
                        page,
                        page_size,
                        total_pages: pages,
                        is_search: false,
                        filters_applied: false,
                    });
                }
            }
            Err(err) => {
                log::warn!("[list] full index unavailable, paginating upstream: {err}")
            }
        }

        self.list_from_upstream(page, page_size).await
    }

    /// Exact-name search path. NotFound maps to an empty page; the result is
    /// always a single page.
    async fn search_one(
        &self,
        query: &str,
        filters: &Filters,
        filters_applied: bool,
    ) -> Result<ListPage, DexError> {
        let detail = match self.get_entity(query).await {
            Ok(detail) => detail,
            Err(err) if err.is_not_found() => {
                return Ok(ListPage {
                    items: Vec::new(),
                    total: 0,
                    page: 1,
                    page_size: 1,
                    total_pages: 1,
                    is_search: true,
                    filters_applied,
                })
            }
            Err(err) => return Err(err),
        };

        let entry = builder::enrich_detail(self.upstream.as_ref(), &detail).await;
        let matches = filters.matches(&entry);
        Ok(ListPage {
            items: if matches { vec![entry] } else { Vec::new() },
            total: usize::from(matches),
            page: 1,
            page_size: 1,
            total_pages: 1,
            is_search: true,
            filters_applied,
        })
    }

    /// Degraded listing path used when the index cannot be built: paginate
    /// the raw upstream listing and enrich each row best-effort. Items that
    /// fail enrichment shrink to a minimal shape instead of failing the page.
    async fn list_from_upstream(&self, page: u32, page_size: u32) -> Result<ListPage, DexError> {
        let page_size = page_size.max(1);
        let mut page = page.max(1);
        let mut listing = self.fetch_listing_page(page, page_size).await?;

        let total = listing.count.min(self.config.max_count) as usize;
        let pages = total_pages(total, page_size);
        if page > pages {
            // The request pointed past the end; serve the last page instead.
            page = pages;
            listing = self.fetch_listing_page(page, page_size).await?;
        }

        let upstream = self.upstream.clone();
        let items = map_batches(listing.results, self.config.listing_concurrency, |result| {
            let upstream = upstream.clone();
            async move {
                match upstream.fetch_pokemon(&result.name).await {
                    Ok(detail) => builder::enrich_detail(upstream.as_ref(), &detail).await,
                    Err(err) => {
                        log::warn!("[list] could not fetch {}: {err}", result.name);
                        builder::fallback_entry(&result)
                    }
                }
            }
        })
        .await;

        Ok(ListPage {
            items,
            total,
            page,
            page_size,
            total_pages: pages,
            is_search: false,
            filters_applied: false,
        })
    }

    /// One raw listing page. The offset is computed in 64 bits and saturated,
    /// so absurd page numbers yield an empty page instead of overflowing.
    async fn fetch_listing_page(&self, page: u32, page_size: u32) -> Result<PageResponse, DexError> {
        let offset = u64::from(page - 1) * u64::from(page_size);
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        Ok(self.upstream.fetch_page(offset, page_size).await?)
    }

    /// Detail view: the cached entity plus flavor text, encounter locations,
    /// and the sprite gallery, the fetched extras degrading to empty on
    /// upstream failure.
    pub async fn get_profile(&self, name: &str) -> Result<Profile, DexError> {
        let pokemon = self.get_entity(name).await?;

        let (species, encounters) = futures::join!(
            self.upstream.fetch_species(&pokemon.name),
            self.upstream.fetch_encounters(&pokemon.name),
        );

        let flavor_text = match species {
            Ok(species) => select_flavor_text(&species),
            Err(err) => {
                log::warn!("[profile] species unavailable for {}: {err}", pokemon.name);
                None
            }
        };
        let encounter_locations = match encounters {
            Ok(encounters) => encounter_locations(&encounters),
            Err(err) => {
                log::warn!("[profile] encounters unavailable for {}: {err}", pokemon.name);
                Vec::new()
            }
        };

        let sprite_gallery = sprite_gallery(&pokemon.sprites);
        Ok(Profile {
            pokemon,
            flavor_text,
            encounter_locations,
            sprite_gallery,
        })
    }

    // Option catalogs for the filterable dimensions, consumed by rendering.

    pub fn type_options(&self) -> &'static [&'static str] {
        common::TYPE_OPTIONS
    }

    pub fn generation_options(&self) -> &'static [&'static str] {
        common::GENERATION_OPTIONS
    }

    pub fn evolution_options(&self) -> &'static [EvolutionStage] {
        &EvolutionStage::ALL
    }

    pub fn legendary_options(&self) -> &'static [LegendaryKind] {
        &LegendaryKind::ALL
    }
}

/// Picks the English flavor text when present, else the first entry, with
/// newlines and form feeds collapsed to single spaces.
fn select_flavor_text(species: &SpeciesResponse) -> Option<String> {
    let entries = &species.flavor_text_entries;
    let preferred = entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .or_else(|| entries.first())?;
    Some(normalize_flavor_text(&preferred.flavor_text))
}

fn normalize_flavor_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assembles the six named sprite variants of the gallery, skipping absent
/// URLs and dropping duplicates by URL with the first variant winning. The
/// shiny front falls back to the official artwork's shiny render.
fn sprite_gallery(sprites: &SpriteSet) -> Vec<SpriteGalleryEntry> {
    let artwork = sprites.other.get("official-artwork");
    let home = sprites.other.get("home");
    let variants: [(&'static str, &'static str, Option<&String>); 6] = [
        (
            "official",
            "Official artwork",
            artwork.and_then(|v| v.front_default.as_ref()),
        ),
        ("front-default", "Classic front", sprites.front_default.as_ref()),
        ("back-default", "Classic back", sprites.back_default.as_ref()),
        (
            "front-shiny",
            "Shiny front",
            sprites
                .front_shiny
                .as_ref()
                .or_else(|| artwork.and_then(|v| v.front_shiny.as_ref())),
        ),
        ("back-shiny", "Shiny back", sprites.back_shiny.as_ref()),
        ("home", "Modern model", home.and_then(|v| v.front_default.as_ref())),
    ];

    let mut gallery: Vec<SpriteGalleryEntry> = Vec::new();
    for (key, label, url) in variants {
        let Some(url) = url else { continue };
        if gallery.iter().any(|entry| &entry.url == url) {
            continue;
        }
        gallery.push(SpriteGalleryEntry {
            key,
            label,
            url: url.clone(),
        });
    }
    gallery
}

/// Formats encounter rows as `Location (Version, ...)`, deduped, capped at
/// four locations and three versions each.
fn encounter_locations(encounters: &[EncounterResponse]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for encounter in encounters {
        let location = common::format_slug(&encounter.location_area.name);
        let mut versions: Vec<String> = Vec::new();
        for detail in &encounter.version_details {
            let version = common::format_slug(&detail.version.name);
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        versions.truncate(3);

        let label = if versions.is_empty() {
            location
        } else {
            format!("{location} ({})", versions.join(", "))
        };
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels.truncate(4);
    labels
}
