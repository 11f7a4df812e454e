//! Population block of a tier

use serde::{Deserialize, Serialize};

/// Aggregate population of a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    /// Current head count (always >= 0)
    pub total: f64,
    /// Effective yearly growth rate applied on the last update
    pub growth: f64,
    /// Logistic carrying capacity `K` (always > 0)
    pub carrying_capacity: f64,
}

impl Population {
    pub fn new(total: f64, carrying_capacity: f64) -> Self {
        Self {
            total,
            growth: 0.0,
            carrying_capacity,
        }
    }

    /// Population as a fraction of carrying capacity
    pub fn density(&self) -> f64 {
        if self.carrying_capacity > 0.0 {
            self.total / self.carrying_capacity
        } else {
            0.0
        }
    }

    pub fn is_over_capacity(&self) -> bool {
        self.total > self.carrying_capacity
    }

    /// Apply a fractional change (e.g. -0.1 for a 10% loss), never going below zero
    pub fn apply_fraction(&mut self, fraction: f64) {
        self.total = (self.total * (1.0 + fraction)).max(0.0);
    }
}
