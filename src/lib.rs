//! Caching Pokédex library over the public PokeAPI.
//!
//! The crate wraps the upstream REST API with two cooperating caches: a
//! read-through per-entity cache backed by an optional durable store, and an
//! in-memory full-index snapshot used for filtered and paginated listings.
//! [`Pokedex`] is the entry point; everything else is plumbing it composes.
//!
//! ```no_run
//! use pokedex_rs::{DexConfig, Filters, Pokedex};
//!
//! # async fn example() -> Result<(), pokedex_rs::Error> {
//! let dex = Pokedex::new(DexConfig::default(), None);
//! let page = dex.list(1, 20, None, &Filters::default()).await?;
//! for entry in &page.items {
//!     println!("{} {}", entry.formatted_id(), entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod dex;
pub mod pokeapi;
pub mod store;

use thiserror::Error;

pub use config::DexConfig;
pub use dex::entity::{EvolutionStage, Filters, LegendaryKind, ListPage, PokemonEntry};
pub use dex::{Pokedex, Profile, SpriteGalleryEntry};
pub use pokeapi::{PokeApiClient, UpstreamSource};
pub use store::{StoreBackend, StoreGateway, StoredRecord};

#[cfg(feature = "store-sqlite")]
pub use store::sqlite::SqliteBackend;

#[derive(Error, Debug)]
pub enum Error {
    #[error("dex error")]
    Dex(#[from] dex::error::DexError),
}

/// Opens a Pokédex with the default upstream client and, when `store_url` is
/// given, a SQLite durable store at that URL.
#[cfg(feature = "store-sqlite")]
pub async fn open(config: DexConfig, store_url: Option<&str>) -> Result<Pokedex, Error> {
    use std::sync::Arc;

    let backend = match store_url {
        Some(url) => {
            let backend = SqliteBackend::from_url(url)
                .await
                .map_err(dex::error::DexError::from)?;
            Some(Arc::new(backend) as Arc<dyn StoreBackend>)
        }
        None => None,
    };
    Ok(Pokedex::new(config, backend))
}
