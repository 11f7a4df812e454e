//! Abstract tiers - one node of the seven-rank spatial hierarchy
//!
//! A tier holds continuous state (population, economy, stability, tech, belief,
//! research) plus the few individual entities that survive renormalization.
//! Tiers reference each other by `TierId` only; the `TierArena` owns them all.

pub mod arena;
pub mod belief;
pub mod definition;
pub mod economy;
pub mod history;
pub mod institutions;
pub mod population;
pub mod preserved;
pub mod stability;
pub mod tech;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{Resource, Tick, TierId, TierMode, TierRank};
use crate::research::state::ResearchState;

pub use arena::TierArena;
pub use belief::Belief;
pub use economy::Economy;
pub use history::{EventKind, EventLog, HistoricalEvent};
pub use institutions::{ResearchGuild, ScientistPool, TradeRoute, TransportHub, University};
pub use population::Population;
pub use preserved::{Building, BuildingKind, NamedEntity, PreservedEntities};
pub use stability::{Stability, StabilityPenalty, StabilityWeights};
pub use tech::Tech;

/// Extra state carried only by megasegments and gigasegments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentExtension {
    /// Cultural trait weights in [0, 1]
    pub culture: BTreeMap<String, f64>,
    /// Opinion of sibling segments in [-100, 100]
    pub diplomacy: BTreeMap<TierId, f64>,
}

impl SegmentExtension {
    pub fn opinion_of(&self, other: TierId) -> f64 {
        self.diplomacy.get(&other).copied().unwrap_or(0.0)
    }
}

/// One node of the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractTier {
    pub id: TierId,
    pub name: String,
    pub rank: TierRank,
    mode: TierMode,
    pub parent: Option<TierId>,
    pub children: Vec<TierId>,

    pub population: Population,
    pub economy: Economy,
    pub stability: Stability,
    pub tech: Tech,
    pub belief: Belief,

    /// Routes between this tier's children; this tier mediates them
    pub trade_routes: Vec<TradeRoute>,
    pub transport_hubs: Vec<TransportHub>,
    pub universities: Vec<University>,
    pub research_guilds: Vec<ResearchGuild>,
    pub scientist_pool: ScientistPool,
    pub research: ResearchState,

    pub preserved: PreservedEntities,
    pub extension: Option<SegmentExtension>,
}

impl AbstractTier {
    /// Create an abstract-mode tier; malformed values are configuration errors
    pub fn new(id: TierId, name: impl Into<String>, rank: TierRank, population: f64, carrying_capacity: f64) -> Result<Self> {
        if !(carrying_capacity.is_finite() && carrying_capacity > 0.0) {
            return Err(EngineError::NonPositiveCarryingCapacity { tier: id, value: carrying_capacity });
        }
        if !(population.is_finite() && population >= 0.0) {
            return Err(EngineError::InvalidPopulation { tier: id, value: population });
        }

        Ok(Self {
            id,
            name: name.into(),
            rank,
            mode: TierMode::Abstract,
            parent: None,
            children: Vec::new(),
            population: Population::new(population, carrying_capacity),
            economy: Economy::new(),
            stability: Stability::default(),
            tech: Tech::default(),
            belief: Belief::new(),
            trade_routes: Vec::new(),
            transport_hubs: Vec::new(),
            universities: Vec::new(),
            research_guilds: Vec::new(),
            scientist_pool: ScientistPool::new(),
            research: ResearchState::new(),
            preserved: PreservedEntities::new(),
            extension: rank.has_segment_extension().then(SegmentExtension::default),
        })
    }

    pub fn with_stability(mut self, stability: Stability) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_tech_level(mut self, level: u8) -> Self {
        self.tech = Tech::at_level(level);
        self
    }

    pub fn with_stockpile(mut self, resource: Resource, amount: f64) -> Self {
        self.economy.set_stockpile(resource, amount);
        self
    }

    /// Set yearly production and consumption of a resource
    pub fn with_rates(mut self, resource: Resource, production: f64, consumption: f64) -> Result<Self> {
        self.economy.set_production(resource, production)?;
        self.economy.set_consumption(resource, consumption)?;
        Ok(self)
    }

    pub fn with_believers(mut self, deity: &str, believers: f64, temples: u32) -> Self {
        self.belief.set_believers(deity, believers);
        self.belief.set_temples(deity, temples);
        self.enforce_belief_bound();
        self
    }

    pub fn with_university(mut self, university: University) -> Self {
        self.universities.push(university);
        self
    }

    pub fn with_guild(mut self, guild: ResearchGuild) -> Self {
        self.research_guilds.push(guild);
        self
    }

    pub fn with_transport_hub(mut self, hub: TransportHub) -> Self {
        self.transport_hubs.push(hub);
        self
    }

    pub fn mode(&self) -> TierMode {
        self.mode
    }

    /// Only the controller changes modes
    pub(crate) fn set_mode(&mut self, mode: TierMode) {
        self.mode = mode;
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.preserved.events
    }

    pub fn log_event(&mut self, tick: Tick, kind: EventKind, description: impl Into<String>, severity: f64) -> u64 {
        self.preserved.events.add_event(self.id, tick, kind, description, severity)
    }

    /// Σ university.tier²
    pub fn university_strength(&self) -> f64 {
        self.universities.iter().map(University::strength).sum()
    }

    /// Σ guild.tier × influence
    pub fn guild_influence(&self) -> f64 {
        self.research_guilds.iter().map(ResearchGuild::weight).sum()
    }

    /// Scale population and believers together, keeping religious shares
    pub fn scale_population(&mut self, factor: f64) {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 0.0 };
        self.population.total *= factor;
        self.belief.scale(factor);
        self.enforce_belief_bound();
    }

    /// Clamp believers to the population; logs when the invariant had been broken
    pub fn enforce_belief_bound(&mut self) -> Option<f64> {
        let removed = self.belief.enforce_bound(self.population.total);
        if let Some(excess) = removed {
            tracing::warn!(
                tier = %self.id,
                excess,
                "believers exceeded population, clamped"
            );
        }
        removed
    }

    /// Check the construction-time invariants
    pub fn validate(&self) -> Result<()> {
        let cap = self.population.carrying_capacity;
        if !(cap.is_finite() && cap > 0.0) {
            return Err(EngineError::NonPositiveCarryingCapacity { tier: self.id, value: cap });
        }
        let total = self.population.total;
        if !(total.is_finite() && total >= 0.0) {
            return Err(EngineError::InvalidPopulation { tier: self.id, value: total });
        }
        if self.tech.level > tech::MAX_TECH_LEVEL {
            return Err(EngineError::InvalidConfig(format!(
                "{}: tech level {} exceeds {}",
                self.id,
                self.tech.level,
                tech::MAX_TECH_LEVEL
            )));
        }
        for (resource, rate) in self
            .economy
            .production_rates()
            .iter()
            .chain(self.economy.consumption_rates().iter())
        {
            if !(rate.is_finite() && *rate >= 0.0) {
                return Err(EngineError::InvalidRate { resource: *resource, value: *rate });
            }
        }
        Ok(())
    }
}
