//! Client for the upstream REST API.
//!
//! All operations are idempotent GETs returning typed JSON. The
//! [`UpstreamSource`] trait is the seam the rest of the crate consumes, so the
//! caching layers can be exercised against in-memory fakes.

pub mod error;
pub mod types;

use async_trait::async_trait;
use error::ApiError;
use serde::de::DeserializeOwned;
use types::{EncounterResponse, EvolutionChainResponse, PageResponse, PokemonResponse, SpeciesResponse};

/// Typed fetches against the remote collection.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Full detail for one entity by canonical name (or numeric id as text).
    async fn fetch_pokemon(&self, name: &str) -> Result<PokemonResponse, ApiError>;

    /// Species metadata (generation, legendary flags, evolution chain link).
    async fn fetch_species(&self, name: &str) -> Result<SpeciesResponse, ApiError>;

    /// Evolution chain tree, addressed by the URL the species record carries.
    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionChainResponse, ApiError>;

    /// One page of the collection listing.
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PageResponse, ApiError>;

    /// Encounter locations for one entity.
    async fn fetch_encounters(&self, name: &str) -> Result<Vec<EncounterResponse>, ApiError>;
}

/// Reqwest-backed implementation of [`UpstreamSource`].
pub struct PokeApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Uses an existing `reqwest::Client`, sharing its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.get_url(&format!("{}{endpoint}", self.base_url)).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "pokedex-rs")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.to_owned()));
        }
        if !status.is_success() {
            log::debug!("upstream returned {status} for {url}");
            return Err(ApiError::Status(status));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl UpstreamSource for PokeApiClient {
    async fn fetch_pokemon(&self, name: &str) -> Result<PokemonResponse, ApiError> {
        let sanitized = name.trim().to_lowercase();
        self.get_json(&format!("/pokemon/{sanitized}")).await
    }

    async fn fetch_species(&self, name: &str) -> Result<SpeciesResponse, ApiError> {
        let sanitized = name.trim().to_lowercase();
        self.get_json(&format!("/pokemon-species/{sanitized}")).await
    }

    async fn fetch_evolution_chain(&self, url: &str) -> Result<EvolutionChainResponse, ApiError> {
        let normalized = url.trim_end_matches('/');
        if normalized.starts_with("http") {
            self.get_url(normalized).await
        } else if normalized.starts_with('/') {
            self.get_json(normalized).await
        } else {
            self.get_json(&format!("/{normalized}")).await
        }
    }

    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PageResponse, ApiError> {
        self.get_json(&format!("/pokemon?limit={limit}&offset={offset}"))
            .await
    }

    async fn fetch_encounters(&self, name: &str) -> Result<Vec<EncounterResponse>, ApiError> {
        let sanitized = name.trim().to_lowercase();
        self.get_json(&format!("/pokemon/{sanitized}/encounters"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = PokeApiClient::new("https://pokeapi.co/api/v2/");
        assert_eq!(client.base_url, "https://pokeapi.co/api/v2");
    }

    #[test]
    fn typed_records_decode_upstream_shapes() {
        let detail: PokemonResponse = serde_json::from_str(
            r#"{
                "id": 25,
                "name": "pikachu",
                "height": 4,
                "weight": 60,
                "sprites": {
                    "front_default": "https://img/25.png",
                    "back_default": null,
                    "front_shiny": null,
                    "back_shiny": null,
                    "other": {"official-artwork": {"front_default": "https://art/25.png"}}
                },
                "types": [{"slot": 1, "type": {"name": "electric", "url": "u"}}],
                "species": {"name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/"},
                "stats": []
            }"#,
        )
        .unwrap();
        assert_eq!(detail.id, 25);
        assert_eq!(detail.types[0].kind.name, "electric");
        assert_eq!(
            detail.sprites.other["official-artwork"].front_default.as_deref(),
            Some("https://art/25.png")
        );

        let chain: EvolutionChainResponse = serde_json::from_str(
            r#"{
                "id": 10,
                "chain": {
                    "species": {"name": "pichu", "url": "u"},
                    "evolves_to": [{
                        "species": {"name": "pikachu", "url": "u"},
                        "evolves_to": [{"species": {"name": "raichu", "url": "u"}, "evolves_to": []}]
                    }]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(chain.chain.evolves_to[0].evolves_to[0].species.name, "raichu");
    }
}
