//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for tiers in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierId(pub u32);

impl TierId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier#{}", self.0)
    }
}

/// Unique identifier for named entities (NPCs, scientists, buildings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an id from RNG bytes so seeded runs stay reproducible
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier for research institutions (universities and guilds) within a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstitutionId {
    University(u32),
    Guild(u32),
}

/// Identifier for a research paper within a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaperId(pub u32);

/// Controller tick counter (wall-tick unit)
pub type Tick = u64;

/// Spatial rank of a tier, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TierRank {
    Tile = 0,
    Chunk = 1,
    Zone = 2,
    Region = 3,
    Subsection = 4,
    Megasegment = 5,
    Gigasegment = 6,
}

impl TierRank {
    pub const ALL: [TierRank; 7] = [
        TierRank::Tile,
        TierRank::Chunk,
        TierRank::Zone,
        TierRank::Region,
        TierRank::Subsection,
        TierRank::Megasegment,
        TierRank::Gigasegment,
    ];

    /// Returns true if this rank is larger than the other
    pub fn outranks(&self, other: &TierRank) -> bool {
        (*self as u8) > (*other as u8)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Megasegments and gigasegments carry culture/diplomacy extension data
    pub fn has_segment_extension(&self) -> bool {
        *self >= TierRank::Megasegment
    }

    pub fn name(&self) -> &'static str {
        match self {
            TierRank::Tile => "tile",
            TierRank::Chunk => "chunk",
            TierRank::Zone => "zone",
            TierRank::Region => "region",
            TierRank::Subsection => "subsection",
            TierRank::Megasegment => "megasegment",
            TierRank::Gigasegment => "gigasegment",
        }
    }
}

/// How a tier is currently simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMode {
    /// Pure statistics, no individual entities
    Abstract,
    /// Ancestor of an active tier: rolled up from children, aggregated here
    SemiActive,
    /// Backed by the external entity-simulation engine
    Active,
}

impl TierMode {
    pub fn is_delegated(&self) -> bool {
        !matches!(self, TierMode::Abstract)
    }
}

/// Economic resources tracked by tier stockpiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Food,
    Water,
    Wood,
    Stone,
    Metal,
    Goods,
    Energy,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Food,
        Resource::Water,
        Resource::Wood,
        Resource::Stone,
        Resource::Metal,
        Resource::Goods,
        Resource::Energy,
    ];

    /// Shortages of vital resources suppress population growth
    pub fn is_vital(&self) -> bool {
        matches!(self, Resource::Food | Resource::Water)
    }
}

/// Research fields specialists and papers belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchField {
    Mathematics,
    Physics,
    Chemistry,
    Biology,
    Medicine,
    Engineering,
    Agriculture,
    Philosophy,
}

impl ResearchField {
    pub const ALL: [ResearchField; 8] = [
        ResearchField::Mathematics,
        ResearchField::Physics,
        ResearchField::Chemistry,
        ResearchField::Biology,
        ResearchField::Medicine,
        ResearchField::Engineering,
        ResearchField::Agriculture,
        ResearchField::Philosophy,
    ];

    /// Specializations a scientist in this field may be drawn with
    pub fn specialization_pool(&self) -> &'static [&'static str] {
        match self {
            ResearchField::Mathematics => &["number theory", "topology", "statistics", "logic", "geometry"],
            ResearchField::Physics => &["mechanics", "optics", "thermodynamics", "astronomy", "electromagnetism"],
            ResearchField::Chemistry => &["metallurgy", "alchemy", "catalysis", "materials", "synthesis"],
            ResearchField::Biology => &["botany", "zoology", "genetics", "ecology", "microbiology"],
            ResearchField::Medicine => &["surgery", "pharmacology", "epidemiology", "anatomy", "immunology"],
            ResearchField::Engineering => &["civil", "hydraulics", "machines", "structures", "transport"],
            ResearchField::Agriculture => &["irrigation", "soil science", "animal husbandry", "crop breeding"],
            ResearchField::Philosophy => &["ethics", "epistemology", "theology", "political theory"],
        }
    }
}
