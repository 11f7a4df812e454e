//! Statistical simulation of abstract tiers
//!
//! Each concern is a free function over one tier, in the order the
//! simulator applies them. None of them reads or writes another tier;
//! cross-tier work (rollup, trade, neighbour belief) is done by the
//! controller afterwards.

pub mod belief;
pub mod economy;
pub mod events;
pub mod population;
pub mod stability;
pub mod tech;
pub mod trade;

use crate::core::config::EngineConfig;
use crate::core::types::Tick;
use crate::tier::AbstractTier;

pub use belief::update_belief;
pub use economy::{update_economy, Shortage};
pub use events::{CatalogueEvent, EventCatalogue, EventEffect, EventInjector, EventTemplate};
pub use population::{growth_rate, logistic_step, update_population};
pub use stability::{targets, update_stability, StabilityTargets};
pub use tech::update_tech;
pub use trade::{TradeReport, TradeStabilizer};

/// Summary of one tier update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub shortages: Vec<Shortage>,
    pub tech_levels: Vec<u8>,
}

/// Advances one tier's continuous state by a span of simulated time
#[derive(Debug, Clone)]
pub struct StatisticalSimulator {
    config: EngineConfig,
}

impl StatisticalSimulator {
    pub fn new(config: &EngineConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full statistical update of an abstract tier
    pub fn advance(&self, tier: &mut AbstractTier, dt_years: f64, tick: Tick) -> StepReport {
        if !(dt_years.is_finite() && dt_years > 0.0) {
            return StepReport::default();
        }
        let shortages = update_economy(tier, dt_years, tick, &self.config.economy);
        update_population(tier, dt_years, &self.config.population);
        tier.enforce_belief_bound();
        update_stability(tier, dt_years, &self.config.stability);
        let tech_levels = update_tech(tier, dt_years, tick, &self.config.tech);
        update_belief(tier, dt_years, &self.config.belief);

        StepReport { shortages, tech_levels }
    }

    /// Partial update for tiers whose population and economy come from elsewhere
    /// (entity-engine feed or child rollup): tech, belief and the stability
    /// counter still advance here
    pub fn advance_delegated(&self, tier: &mut AbstractTier, dt_years: f64, tick: Tick) -> StepReport {
        if !(dt_years.is_finite() && dt_years > 0.0) {
            return StepReport::default();
        }
        update_stability(tier, dt_years, &self.config.stability);
        let tech_levels = update_tech(tier, dt_years, tick, &self.config.tech);
        update_belief(tier, dt_years, &self.config.belief);
        StepReport { shortages: Vec::new(), tech_levels }
    }
}
