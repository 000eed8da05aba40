//! The denormalized index entry and the filter/pagination primitives that
//! operate on it.

use crate::common;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Position of a species inside its evolution chain, derived from the chain's
/// tree depth: 0 → base, 1 → stage 1, 2 or deeper → stage 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvolutionStage {
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "stage-1")]
    Stage1,
    #[serde(rename = "stage-2")]
    Stage2,
}

impl EvolutionStage {
    pub const ALL: [EvolutionStage; 3] =
        [EvolutionStage::Base, EvolutionStage::Stage1, EvolutionStage::Stage2];

    /// Stage for a chain-walk depth. Negative depth means the species was not
    /// found in its own chain; such entries fall back to the base stage.
    pub fn from_depth(depth: i32) -> Self {
        match depth {
            d if d <= 0 => EvolutionStage::Base,
            1 => EvolutionStage::Stage1,
            _ => EvolutionStage::Stage2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionStage::Base => "base",
            EvolutionStage::Stage1 => "stage-1",
            EvolutionStage::Stage2 => "stage-2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvolutionStage::Base => "Base form",
            EvolutionStage::Stage1 => "First evolution",
            EvolutionStage::Stage2 => "Final evolution",
        }
    }
}

impl fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unrecognized evolution stage")]
pub struct ParseStageError;

impl FromStr for EvolutionStage {
    type Err = ParseStageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "base" => Ok(EvolutionStage::Base),
            "stage-1" => Ok(EvolutionStage::Stage1),
            "stage-2" => Ok(EvolutionStage::Stage2),
            _ => Err(ParseStageError),
        }
    }
}

/// Legendary-or-not filter dimension (mythical entities count as legendary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendaryKind {
    Legendary,
    Standard,
}

impl LegendaryKind {
    pub const ALL: [LegendaryKind; 2] = [LegendaryKind::Legendary, LegendaryKind::Standard];
}

#[derive(Error, Debug)]
#[error("unrecognized legendary filter")]
pub struct ParseLegendaryError;

impl FromStr for LegendaryKind {
    type Err = ParseLegendaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "legendary" => Ok(LegendaryKind::Legendary),
            "standard" => Ok(LegendaryKind::Standard),
            _ => Err(ParseLegendaryError),
        }
    }
}

/// One enriched, denormalized entry of the full index.
///
/// Identity is the numeric id; the canonical name is a unique secondary key.
/// Regional variants sharing a species are deduplicated at build time, so the
/// index holds at most one entry per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonEntry {
    pub id: u32,
    pub name: String,
    pub sprite: String,
    pub types: Vec<String>,
    pub generation: Option<String>,
    pub is_legendary: bool,
    pub evolution_stage: EvolutionStage,
    pub evolves_from: Option<String>,
}

impl PokemonEntry {
    pub fn formatted_id(&self) -> String {
        common::format_entry_id(self.id)
    }

    pub fn generation_label(&self) -> String {
        common::generation_label(self.generation.as_deref())
    }
}

/// Optional constraints applied to listings with AND semantics.
/// No constraint set matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Elemental type tag; matches membership in the entry's type list.
    pub kind: Option<String>,
    pub generation: Option<String>,
    pub evolution: Option<EvolutionStage>,
    pub legendary: Option<LegendaryKind>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.generation.is_none()
            && self.evolution.is_none()
            && self.legendary.is_none()
    }

    pub fn matches(&self, entry: &PokemonEntry) -> bool {
        if let Some(kind) = &self.kind {
            if !entry.types.iter().any(|t| t == kind) {
                return false;
            }
        }
        if let Some(generation) = &self.generation {
            if entry.generation.as_deref() != Some(generation.as_str()) {
                return false;
            }
        }
        if let Some(stage) = self.evolution {
            if entry.evolution_stage != stage {
                return false;
            }
        }
        match self.legendary {
            Some(LegendaryKind::Legendary) if !entry.is_legendary => return false,
            Some(LegendaryKind::Standard) if entry.is_legendary => return false,
            _ => {}
        }
        true
    }
}

/// One page of listing results as served to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage {
    pub items: Vec<PokemonEntry>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub is_search: bool,
    pub filters_applied: bool,
}

/// `max(1, ceil(total / page_size))`.
pub fn total_pages(total: usize, page_size: u32) -> u32 {
    let page_size = page_size.max(1) as usize;
    (total.div_ceil(page_size)).max(1) as u32
}

/// Clamps `page` into `[1, total_pages]` and slices that page out of `items`.
/// Returns the page items along with the normalized page number and page count.
pub fn slice_page(
    items: &[PokemonEntry],
    total: usize,
    page: u32,
    page_size: u32,
) -> (Vec<PokemonEntry>, u32, u32) {
    let pages = total_pages(total, page_size);
    let page = page.clamp(1, pages);
    let start = (page - 1) as usize * page_size.max(1) as usize;
    let slice = items
        .iter()
        .skip(start)
        .take(page_size.max(1) as usize)
        .cloned()
        .collect();
    (slice, page, pages)
}
