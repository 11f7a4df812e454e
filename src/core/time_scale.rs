//! Time-scale table: simulated time per controller tick, per tier rank
//!
//! One wall tick is `wall_tick_minutes` of real-scale time. Each rank multiplies
//! that by its own factor, so a chunk advances in minutes while a gigasegment
//! advances a full year per tick.

use serde::{Deserialize, Serialize};

use crate::core::types::TierRank;

/// Simulated minutes in one year (365 days)
pub const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Multiplier from wall-tick time to simulated time, indexed by `TierRank`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeScaleTable {
    multipliers: [f64; 7],
}

impl Default for TimeScaleTable {
    fn default() -> Self {
        Self {
            multipliers: [
                1.0,       // tile: real time
                1.0,       // chunk: real time
                60.0,      // zone: 1 tick = 1 hour
                1_440.0,   // region: 1 tick = 1 day
                10_080.0,  // subsection: 1 tick = 1 week
                43_200.0,  // megasegment: 1 tick = 30 days
                525_600.0, // gigasegment: 1 tick = 1 year
            ],
        }
    }
}

impl TimeScaleTable {
    pub fn new(multipliers: [f64; 7]) -> Self {
        Self { multipliers }
    }

    pub fn multiplier(&self, rank: TierRank) -> f64 {
        self.multipliers[rank.index()]
    }

    pub fn set_multiplier(&mut self, rank: TierRank, multiplier: f64) {
        self.multipliers[rank.index()] = multiplier;
    }

    /// Simulated years a tier of `rank` advances during one wall tick
    pub fn delta_years(&self, rank: TierRank, wall_tick_minutes: f64) -> f64 {
        wall_tick_minutes * self.multiplier(rank) / MINUTES_PER_YEAR
    }

    /// Wall ticks needed for a tier of `rank` to advance one simulated year
    pub fn ticks_per_year(&self, rank: TierRank, wall_tick_minutes: f64) -> f64 {
        MINUTES_PER_YEAR / (wall_tick_minutes * self.multiplier(rank))
    }

    pub fn validate(&self) -> Result<(), String> {
        for rank in TierRank::ALL {
            let m = self.multiplier(rank);
            if !(m.is_finite() && m > 0.0) {
                return Err(format!("time scale for {} must be positive, got {}", rank.name(), m));
            }
        }
        for pair in TierRank::ALL.windows(2) {
            if self.multiplier(pair[1]) < self.multiplier(pair[0]) {
                return Err(format!(
                    "time scale for {} ({}) is below {} ({})",
                    pair[1].name(),
                    self.multiplier(pair[1]),
                    pair[0].name(),
                    self.multiplier(pair[0]),
                ));
            }
        }
        Ok(())
    }
}
