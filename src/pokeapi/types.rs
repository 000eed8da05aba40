//! Typed records for the upstream API responses.
//!
//! Every payload crossing the HTTP boundary is deserialized into one of these
//! structs; the rest of the crate never touches raw JSON from the upstream.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `{ name, url }` reference, the upstream's universal link shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// A `{ url }` reference without a name (e.g. a species' evolution chain).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResourceRef {
    pub url: String,
}

/// One page of the paginated collection listing.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PageResponse {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<NamedResource>,
}

/// Full detail record for a single entity.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PokemonResponse {
    pub id: u32,
    pub name: String,
    pub height: Option<u32>,
    pub weight: Option<u32>,
    #[serde(default)]
    pub sprites: SpriteSet,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    /// Canonical species reference; regional variants of the same species
    /// share this name while carrying distinct ids.
    pub species: Option<NamedResource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SpriteSet {
    pub front_default: Option<String>,
    pub back_default: Option<String>,
    pub front_shiny: Option<String>,
    pub back_shiny: Option<String>,
    #[serde(default)]
    pub other: HashMap<String, SpriteVariant>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SpriteVariant {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

/// Species-level metadata used to enrich index entries.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpeciesResponse {
    pub id: u32,
    pub name: String,
    pub generation: Option<NamedResource>,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    pub evolves_from_species: Option<NamedResource>,
    pub evolution_chain: Option<ResourceRef>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedResource,
    pub version: Option<NamedResource>,
}

/// Evolution chain tree: a root species with recursively nested successors.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EvolutionChainResponse {
    pub id: u32,
    pub chain: ChainLink,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

/// One encounter location with the game versions it applies to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EncounterResponse {
    pub location_area: NamedResource,
    #[serde(default)]
    pub version_details: Vec<VersionDetail>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionDetail {
    pub version: NamedResource,
}
