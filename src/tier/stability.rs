//! Stability block of a tier
//!
//! `overall` is never stored: it is always the weighted average of the four
//! sub-scores, so it cannot drift from them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::config::StabilityConfig;
use crate::core::types::Resource;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

/// Fixed weights of the sub-scores in `overall`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityWeights {
    pub economic: f64,
    pub social: f64,
    pub infrastructure: f64,
    pub happiness: f64,
}

impl Default for StabilityWeights {
    fn default() -> Self {
        Self::from(&StabilityConfig::default())
    }
}

impl From<&StabilityConfig> for StabilityWeights {
    fn from(config: &StabilityConfig) -> Self {
        Self {
            economic: config.economic_weight,
            social: config.social_weight,
            infrastructure: config.infrastructure_weight,
            happiness: config.happiness_weight,
        }
    }
}

/// A degraded-stability signal recorded instead of failing the tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StabilityPenalty {
    /// Demand for a resource exceeded supply; consumption was truncated
    ResourceShortage { resource: Resource, unmet_fraction: f64, points: f64 },
    /// An invariant had to be clamped back into range
    InvariantClamped { invariant: String, points: f64 },
}

impl StabilityPenalty {
    pub fn points(&self) -> f64 {
        match self {
            StabilityPenalty::ResourceShortage { points, .. } => *points,
            StabilityPenalty::InvariantClamped { points, .. } => *points,
        }
    }
}

/// Sub-scores in [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stability {
    economic: f64,
    social: f64,
    infrastructure: f64,
    happiness: f64,
    weights: StabilityWeights,
    recent_penalties: VecDeque<StabilityPenalty>,
}

impl Default for Stability {
    fn default() -> Self {
        Self::uniform(50.0, StabilityWeights::default())
    }
}

impl Stability {
    pub fn new(economic: f64, social: f64, infrastructure: f64, happiness: f64, weights: StabilityWeights) -> Self {
        Self {
            economic: clamp_score(economic),
            social: clamp_score(social),
            infrastructure: clamp_score(infrastructure),
            happiness: clamp_score(happiness),
            weights,
            recent_penalties: VecDeque::new(),
        }
    }

    pub fn uniform(score: f64, weights: StabilityWeights) -> Self {
        Self::new(score, score, score, score, weights)
    }

    /// Weighted average of the four sub-scores
    pub fn overall(&self) -> f64 {
        let w = &self.weights;
        let total = w.economic + w.social + w.infrastructure + w.happiness;
        if total <= 0.0 {
            return (self.economic + self.social + self.infrastructure + self.happiness) / 4.0;
        }
        clamp_score(
            (self.economic * w.economic
                + self.social * w.social
                + self.infrastructure * w.infrastructure
                + self.happiness * w.happiness)
                / total,
        )
    }

    pub fn economic(&self) -> f64 {
        self.economic
    }

    pub fn social(&self) -> f64 {
        self.social
    }

    pub fn infrastructure(&self) -> f64 {
        self.infrastructure
    }

    pub fn happiness(&self) -> f64 {
        self.happiness
    }

    pub fn weights(&self) -> StabilityWeights {
        self.weights
    }

    pub fn set_economic(&mut self, value: f64) {
        self.economic = clamp_score(value);
    }

    pub fn set_social(&mut self, value: f64) {
        self.social = clamp_score(value);
    }

    pub fn set_infrastructure(&mut self, value: f64) {
        self.infrastructure = clamp_score(value);
    }

    pub fn set_happiness(&mut self, value: f64) {
        self.happiness = clamp_score(value);
    }

    /// Add deltas to every sub-score (events)
    pub fn adjust(&mut self, economic: f64, social: f64, infrastructure: f64, happiness: f64) {
        self.set_economic(self.economic + economic);
        self.set_social(self.social + social);
        self.set_infrastructure(self.infrastructure + infrastructure);
        self.set_happiness(self.happiness + happiness);
    }

    /// Record a penalty and deduct its points from the economic sub-score
    pub fn apply_penalty(&mut self, penalty: StabilityPenalty, capacity: usize) {
        self.set_economic(self.economic - penalty.points());
        self.recent_penalties.push_back(penalty);
        while self.recent_penalties.len() > capacity {
            self.recent_penalties.pop_front();
        }
    }

    pub fn recent_penalties(&self) -> impl Iterator<Item = &StabilityPenalty> {
        self.recent_penalties.iter()
    }

    pub fn clear_penalties(&mut self) {
        self.recent_penalties.clear();
    }
}
