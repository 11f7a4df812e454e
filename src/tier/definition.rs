//! World definitions: TOML-described hierarchies and the built-in demo world

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::StabilityConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{Resource, ResearchField, TierId, TierRank};
use crate::tier::{AbstractTier, ResearchGuild, Stability, StabilityWeights, TierArena, TransportHub, University};

fn default_stability() -> f64 {
    50.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversityDefinition {
    pub name: String,
    pub tier: u8,
    #[serde(default)]
    pub field: Option<ResearchField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildDefinition {
    pub name: String,
    pub tier: u8,
    pub influence: f64,
    #[serde(default)]
    pub field: Option<ResearchField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubDefinition {
    pub name: String,
    pub capacity: f64,
}

/// One tier as written in a world file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDefinition {
    pub id: u32,
    pub name: String,
    pub rank: TierRank,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub population: f64,
    pub carrying_capacity: f64,
    #[serde(default)]
    pub tech_level: u8,
    #[serde(default = "default_stability")]
    pub stability: f64,
    #[serde(default)]
    pub stockpiles: BTreeMap<Resource, f64>,
    #[serde(default)]
    pub production: BTreeMap<Resource, f64>,
    #[serde(default)]
    pub consumption: BTreeMap<Resource, f64>,
    #[serde(default)]
    pub believers: BTreeMap<String, f64>,
    #[serde(default)]
    pub temples: BTreeMap<String, u32>,
    #[serde(default)]
    pub universities: Vec<UniversityDefinition>,
    #[serde(default)]
    pub guilds: Vec<GuildDefinition>,
    #[serde(default)]
    pub hubs: Vec<HubDefinition>,
}

impl TierDefinition {
    fn build(&self, weights: StabilityWeights) -> Result<AbstractTier> {
        let id = TierId(self.id);
        let mut tier = AbstractTier::new(id, self.name.clone(), self.rank, self.population, self.carrying_capacity)?
            .with_tech_level(self.tech_level)
            .with_stability(Stability::uniform(self.stability, weights));

        for (resource, amount) in &self.stockpiles {
            tier.economy.set_stockpile(*resource, *amount);
        }
        for (resource, rate) in &self.production {
            tier.economy.set_production(*resource, *rate)?;
        }
        for (resource, rate) in &self.consumption {
            tier.economy.set_consumption(*resource, *rate)?;
        }
        for (deity, count) in &self.temples {
            tier.belief.set_temples(deity, *count);
        }
        for (deity, count) in &self.believers {
            tier.belief.set_believers(deity, *count);
        }
        tier.enforce_belief_bound();

        for (i, u) in self.universities.iter().enumerate() {
            tier.universities.push(University { id: i as u32 + 1, name: u.name.clone(), tier: u.tier, field: u.field });
        }
        for (i, g) in self.guilds.iter().enumerate() {
            tier.research_guilds.push(ResearchGuild {
                id: i as u32 + 1,
                name: g.name.clone(),
                tier: g.tier,
                influence: g.influence,
                field: g.field,
            });
        }
        for (i, h) in self.hubs.iter().enumerate() {
            tier.transport_hubs.push(TransportHub { id: i as u32 + 1, name: h.name.clone(), capacity: h.capacity });
        }
        Ok(tier)
    }
}

/// A complete hierarchy as written in a world file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDefinition {
    #[serde(default)]
    pub tiers: Vec<TierDefinition>,
}

impl WorldDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build the arena; exactly one root, no cycles, no dangling parents
    pub fn build(&self, stability: &StabilityConfig) -> Result<TierArena> {
        let weights = StabilityWeights::from(stability);

        let mut roots = self.tiers.iter().filter(|t| t.parent.is_none());
        let root = roots
            .next()
            .ok_or_else(|| EngineError::InvalidDefinition("world has no root tier".into()))?;
        if let Some(extra) = roots.next() {
            return Err(EngineError::InvalidDefinition(format!(
                "world has more than one root ({} and {})",
                root.id, extra.id
            )));
        }

        let mut arena = TierArena::new(root.build(weights)?)?;
        let mut pending: Vec<&TierDefinition> = self.tiers.iter().filter(|t| t.parent.is_some()).collect();

        // Attach in waves: a tier is attached once its parent is in the arena
        while !pending.is_empty() {
            let before = pending.len();
            let mut still_pending = Vec::new();
            for def in pending {
                let parent = TierId(def.parent.unwrap_or_default());
                if arena.contains(parent) {
                    arena.add_child(parent, def.build(weights)?)?;
                } else {
                    still_pending.push(def);
                }
            }
            if still_pending.len() == before {
                let stuck = still_pending[0];
                let known = self.tiers.iter().any(|t| Some(t.id) == stuck.parent);
                return Err(if known {
                    EngineError::CyclicHierarchy(TierId(stuck.id))
                } else {
                    EngineError::InvalidDefinition(format!(
                        "tier {} references unknown parent {:?}",
                        stuck.id, stuck.parent
                    ))
                });
            }
            pending = still_pending;
        }

        Ok(arena)
    }
}

impl TierArena {
    /// Build an arena from a parsed world definition
    pub fn from_definition(definition: &WorldDefinition, stability: &StabilityConfig) -> Result<Self> {
        definition.build(stability)
    }
}

const DEITIES: [&str; 3] = ["the Lantern", "the Deep", "the Weaver"];

/// A 63-tier demo hierarchy: gigasegment down to chunks, two children per tier
pub fn demo_world(stability: &StabilityConfig) -> Result<TierArena> {
    let weights = StabilityWeights::from(stability);
    let mut next_id = 1u32;

    let root = AbstractTier::new(TierId(next_id), "Gigasegment Prime", TierRank::Gigasegment, 0.0, 1.0)?
        .with_stability(Stability::uniform(65.0, weights))
        .with_university(University { id: 1, name: "Grand Academy".into(), tier: 9, field: None })
        .with_guild(ResearchGuild {
            id: 1,
            name: "Concord of Artificers".into(),
            tier: 9,
            influence: 0.8,
            field: Some(ResearchField::Engineering),
        });
    let mut arena = TierArena::new(root)?;

    let ranks = [
        TierRank::Megasegment,
        TierRank::Subsection,
        TierRank::Region,
        TierRank::Zone,
        TierRank::Chunk,
    ];

    let mut frontier = vec![TierId(next_id)];
    for (depth, rank) in ranks.iter().enumerate() {
        let mut next_frontier = Vec::new();
        for parent in frontier {
            for sibling in 0..2u32 {
                next_id += 1;
                let id = TierId(next_id);
                // Leaves hold the population; inner tiers are rolled up
                let is_leaf = depth == ranks.len() - 1;
                let population = if is_leaf { 2_000.0 + 500.0 * (next_id % 7) as f64 } else { 0.0 };
                let capacity = if is_leaf { 6_000.0 } else { 1.0 };

                let deity = DEITIES[(next_id as usize) % DEITIES.len()];
                let mut tier = AbstractTier::new(id, format!("{} {}", rank.name(), next_id), *rank, population, capacity)?
                    .with_stability(Stability::uniform(55.0 + 5.0 * sibling as f64, weights))
                    .with_tech_level(1)
                    .with_believers(deity, population * 0.3, 1 + sibling);

                if is_leaf {
                    // Alternate food-rich and wood-rich chunks so siblings trade
                    let (food, wood) = if sibling == 0 { (1_200.0, 100.0) } else { (400.0, 600.0) };
                    tier = tier
                        .with_stockpile(Resource::Food, 500.0)
                        .with_stockpile(Resource::Wood, 200.0)
                        .with_rates(Resource::Food, food, 800.0)?
                        .with_rates(Resource::Wood, wood, 350.0)?;
                }
                if *rank == TierRank::Region {
                    tier = tier.with_university(University {
                        id: 1,
                        name: format!("University of {}", next_id),
                        tier: 4 + sibling as u8,
                        field: None,
                    });
                }
                if *rank == TierRank::Subsection {
                    tier = tier.with_transport_hub(TransportHub {
                        id: 1,
                        name: format!("Spindle Hub {}", next_id),
                        capacity: 10_000.0,
                    });
                }

                arena.add_child(parent, tier)?;
                next_frontier.push(id);
            }
        }
        frontier = next_frontier;
    }

    Ok(arena)
}
