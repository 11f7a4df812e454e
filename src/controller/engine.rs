//! Seam to the external entity-simulation engine that backs active tiers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Resource, TierId};
use crate::renormalization::{EntitySnapshot, ZoomInConstraints};
use crate::tier::AbstractTier;

/// Per-tick data an active tier receives from the entity engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveFeed {
    pub population: f64,
    pub stockpiles: BTreeMap<Resource, f64>,
    /// Yearly rates
    pub production: BTreeMap<Resource, f64>,
    pub consumption: BTreeMap<Resource, f64>,
    /// Believer changes per deity since the last tick
    pub belief_deltas: BTreeMap<String, f64>,
    /// Net resources moved in (positive) or out (negative) by local trade
    pub trade_deltas: BTreeMap<Resource, f64>,
}

impl ActiveFeed {
    /// Fold the feed into the tier; malformed values are skipped and logged
    pub fn apply(&self, tier: &mut AbstractTier) {
        if self.population.is_finite() && self.population >= 0.0 {
            tier.population.total = self.population;
        } else {
            tracing::warn!(tier = %tier.id, value = self.population, "entity feed population rejected");
        }

        for (resource, amount) in &self.stockpiles {
            tier.economy.set_stockpile(*resource, *amount);
        }
        for (resource, rate) in &self.production {
            if let Err(e) = tier.economy.set_production(*resource, *rate) {
                tracing::warn!(tier = %tier.id, error = %e, "entity feed production rejected");
            }
        }
        for (resource, rate) in &self.consumption {
            if let Err(e) = tier.economy.set_consumption(*resource, *rate) {
                tracing::warn!(tier = %tier.id, error = %e, "entity feed consumption rejected");
            }
        }
        for (resource, delta) in &self.trade_deltas {
            if delta.is_finite() {
                let current = tier.economy.stockpile(*resource);
                tier.economy.set_stockpile(*resource, current + delta);
            }
        }

        for (deity, delta) in &self.belief_deltas {
            if delta.is_finite() {
                let current = tier.belief.believers(deity);
                tier.belief.set_believers(deity, (current + delta).max(0.0));
            }
        }
        tier.enforce_belief_bound();
    }

    /// Absolute amount moved by local trade this tick
    pub fn trade_volume(&self) -> f64 {
        self.trade_deltas.values().filter(|d| d.is_finite()).map(|d| d.abs()).sum()
    }
}

/// The discrete simulation that owns active tiers.
///
/// Errors are plain reasons; the controller turns them into rejected
/// commands without touching tier state.
pub trait EntityEngine {
    /// Generate entities satisfying the constraints, or refuse
    fn instantiate(&mut self, constraints: &ZoomInConstraints) -> Result<(), String>;

    /// Read-only snapshot of an active tier, taken on zoom-out
    fn snapshot(&mut self, tier: TierId) -> Result<EntitySnapshot, String>;

    /// Per-tick feed for an active tier
    fn feed(&self, tier: TierId) -> Option<ActiveFeed>;

    /// The tier went back to statistics; drop its entities
    fn release(&mut self, _tier: TierId) {}
}

/// Stand-in entity engine that reproduces its constraints exactly.
///
/// Used by the CLI and tests. `max_population` makes it refuse large tiers.
#[derive(Debug, Clone, Default)]
pub struct NullEntityEngine {
    instantiated: BTreeMap<TierId, ZoomInConstraints>,
    max_population: Option<f64>,
}

impl NullEntityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to instantiate tiers above `limit` inhabitants
    pub fn with_max_population(mut self, limit: f64) -> Self {
        self.max_population = Some(limit);
        self
    }

    pub fn is_instantiated(&self, tier: TierId) -> bool {
        self.instantiated.contains_key(&tier)
    }

    pub fn active_count(&self) -> usize {
        self.instantiated.len()
    }
}

impl EntityEngine for NullEntityEngine {
    fn instantiate(&mut self, constraints: &ZoomInConstraints) -> Result<(), String> {
        let target = constraints.target_population;
        if !target.is_finite() || target < 0.0 {
            return Err(format!("cannot generate {} inhabitants", target));
        }
        if let Some(limit) = self.max_population {
            if target > limit {
                return Err(format!("{} inhabitants exceeds the entity budget of {}", target, limit));
            }
        }
        self.instantiated.insert(constraints.tier_id, constraints.clone());
        Ok(())
    }

    fn snapshot(&mut self, tier: TierId) -> Result<EntitySnapshot, String> {
        self.instantiated
            .get(&tier)
            .map(EntitySnapshot::from_constraints)
            .ok_or_else(|| format!("{} is not instantiated", tier))
    }

    fn feed(&self, tier: TierId) -> Option<ActiveFeed> {
        self.instantiated.get(&tier).map(|c| ActiveFeed {
            population: c.target_population,
            stockpiles: c.stockpiles.clone(),
            production: c.production.clone(),
            consumption: c.consumption.clone(),
            belief_deltas: BTreeMap::new(),
            trade_deltas: BTreeMap::new(),
        })
    }

    fn release(&mut self, tier: TierId) {
        self.instantiated.remove(&tier);
    }
}
