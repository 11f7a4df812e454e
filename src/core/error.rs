use thiserror::Error;

use crate::core::types::{Resource, TierId, TierMode, TierRank};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Tier not found: {0}")]
    TierNotFound(TierId),

    #[error("Duplicate tier id: {0}")]
    DuplicateTier(TierId),

    #[error("{tier}: carrying capacity must be positive, got {value}")]
    NonPositiveCarryingCapacity { tier: TierId, value: f64 },

    #[error("{tier}: population must be a finite non-negative number, got {value}")]
    InvalidPopulation { tier: TierId, value: f64 },

    #[error("{tier}: child rank {child:?} must be below parent rank {parent:?}")]
    RankOrder { tier: TierId, parent: TierRank, child: TierRank },

    #[error("Cyclic parent/child reference through {0}")]
    CyclicHierarchy(TierId),

    #[error("Invalid rate for {resource:?}: {value} (rates must be finite and non-negative)")]
    InvalidRate { resource: Resource, value: f64 },

    #[error("{tier}: cannot move from {from:?} to {to:?}")]
    InvalidModeTransition { tier: TierId, from: TierMode, to: TierMode },

    #[error("{tier}: mode {mode:?} requires a semi-active parent")]
    ModeInvariant { tier: TierId, mode: TierMode },

    #[error("Zoom-in of {tier} rejected by entity engine: {reason}")]
    ZoomRejected { tier: TierId, reason: String },

    #[error("No entity snapshot available for {tier}: {reason}")]
    SnapshotUnavailable { tier: TierId, reason: String },

    #[error("Invalid tier definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
