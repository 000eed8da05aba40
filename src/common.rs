//! Shared constants, filter option catalogs, and small formatting helpers.

use lazy_static::lazy_static;
use regex::Regex;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Known size of the national collection; hard cap for listings and builds.
pub const MAX_POKEMON_COUNT: u32 = 1017;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const OFFICIAL_ARTWORK_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";

/// Elemental type tags recognized by the filter form.
pub const TYPE_OPTIONS: &[&str] = &[
    "bug", "dark", "dragon", "electric", "fairy", "fighting", "fire", "flying", "ghost", "grass",
    "ground", "ice", "normal", "poison", "psychic", "rock", "steel", "water",
];

/// Generation keys as the upstream names them.
pub const GENERATION_OPTIONS: &[&str] = &[
    "generation-i",
    "generation-ii",
    "generation-iii",
    "generation-iv",
    "generation-v",
    "generation-vi",
    "generation-vii",
    "generation-viii",
    "generation-ix",
];

lazy_static! {
    /// Compiled regex for extracting the numeric id from a pokemon resource URL.
    static ref RESOURCE_ID_REGEX: Regex =
        Regex::new(r"/pokemon/(\d+)/?$").expect("RESOURCE_ID_REGEX failed to compile");
}

/// Extracts the numeric id from a `.../pokemon/{id}/` resource URL.
pub fn extract_resource_id(url: &str) -> Option<u32> {
    RESOURCE_ID_REGEX.captures(url)?.get(1)?.as_str().parse().ok()
}

/// Formats a numeric id the way the dex displays it, e.g. `#0042`.
pub fn format_entry_id(id: u32) -> String {
    format!("#{id:04}")
}

/// Human label for a generation key, e.g. `generation-iv` → `Generation IV`.
pub fn generation_label(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "Unknown generation".to_owned();
    };
    let suffix = value.strip_prefix("generation-").unwrap_or(value);
    format!("Generation {}", suffix.to_uppercase())
}

/// Title-cases a hyphen/underscore slug, e.g. `kanto-route-2` → `Kanto Route 2`.
pub fn format_slug(value: &str) -> String {
    value
        .split(['-', '_'])
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let mut chars = chunk.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wall-clock seconds since the Unix epoch. Cache freshness is judged against
/// this, matching the timestamps the durable store records.
pub fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
