//! Institutions and links owned by a tier

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{InstitutionId, Resource, ResearchField, Tick, TierId};

/// A university; its tier (1-10) weighs quadratically in university strength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: u32,
    pub name: String,
    pub tier: u8,
    pub field: Option<ResearchField>,
}

impl University {
    pub fn institution_id(&self) -> InstitutionId {
        InstitutionId::University(self.id)
    }

    pub fn strength(&self) -> f64 {
        let tier = self.tier as f64;
        tier * tier
    }
}

/// A research guild; contributes `tier * influence` to guild influence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchGuild {
    pub id: u32,
    pub name: String,
    pub tier: u8,
    /// Influence in [0, 1]
    pub influence: f64,
    pub field: Option<ResearchField>,
}

impl ResearchGuild {
    pub fn institution_id(&self) -> InstitutionId {
        InstitutionId::Guild(self.id)
    }

    pub fn weight(&self) -> f64 {
        self.tier as f64 * self.influence.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportHub {
    pub id: u32,
    pub name: String,
    pub capacity: f64,
}

/// A trade route between two sibling tiers, owned by their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRoute {
    pub id: u32,
    pub from: TierId,
    pub to: TierId,
    pub resource: Resource,
    /// Yearly volume the route is sized for
    pub rate: f64,
    pub opened_at: Tick,
    /// Consecutive ticks without an imbalance (closes at the hysteresis limit)
    pub calm_ticks: u32,
    pub last_transfer: f64,
    pub total_transferred: f64,
}

impl TradeRoute {
    pub fn connects(&self, a: TierId, b: TierId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Aggregate specialist counts per rarity tier (0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScientistPool {
    counts: BTreeMap<u8, u32>,
}

impl ScientistPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rarity: u8, count: u32) {
        if count > 0 {
            *self.counts.entry(rarity.min(100)).or_insert(0) += count;
        }
    }

    /// Remove up to `count`, returns how many were removed
    pub fn remove(&mut self, rarity: u8, count: u32) -> u32 {
        let Some(current) = self.counts.get_mut(&rarity) else {
            return 0;
        };
        let removed = count.min(*current);
        *current -= removed;
        if *current == 0 {
            self.counts.remove(&rarity);
        }
        removed
    }

    pub fn count(&self, rarity: u8) -> u32 {
        self.counts.get(&rarity).copied().unwrap_or(0)
    }

    /// Specialists at or above a rarity tier
    pub fn count_at_least(&self, rarity: u8) -> u32 {
        self.counts.range(rarity..).map(|(_, c)| *c).sum()
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts.iter().map(|(r, c)| (*r, *c))
    }

    pub fn merge(&mut self, other: &ScientistPool) {
        for (rarity, count) in other.iter() {
            self.add(rarity, count);
        }
    }
}
