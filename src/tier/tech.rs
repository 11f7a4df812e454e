//! Technology block of a tier

use serde::{Deserialize, Serialize};

/// Default efficiency gained per level when no config is at hand
pub const DEFAULT_EFFICIENCY_PER_LEVEL: f64 = 0.1;

pub const MAX_RESEARCH: f64 = 100.0;

/// Highest tech level a tier can hold
pub const MAX_TECH_LEVEL: u8 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tech {
    /// Tech level in [0, 10]
    pub level: u8,
    /// Progress toward the next level in [0, 100]
    pub research: f64,
    /// Production multiplier, always >= 1
    pub efficiency: f64,
}

impl Default for Tech {
    fn default() -> Self {
        Self::at_level(0)
    }
}

impl Tech {
    pub fn at_level(level: u8) -> Self {
        let mut tech = Self {
            level,
            research: 0.0,
            efficiency: 1.0,
        };
        tech.recompute_efficiency(DEFAULT_EFFICIENCY_PER_LEVEL);
        tech
    }

    pub fn recompute_efficiency(&mut self, per_level: f64) {
        self.efficiency = (1.0 + self.level as f64 * per_level).max(1.0);
    }

    /// Add research points, levelling up with carryover; returns each level reached
    ///
    /// At `max_level` research saturates at 100 instead of carrying over.
    pub fn add_research(&mut self, points: f64, max_level: u8) -> Vec<u8> {
        let mut reached = Vec::new();
        if points.is_finite() && points > 0.0 {
            self.research += points;
        }
        while self.research >= MAX_RESEARCH && self.level < max_level {
            self.research -= MAX_RESEARCH;
            self.level += 1;
            reached.push(self.level);
        }
        if self.level >= max_level {
            self.research = self.research.min(MAX_RESEARCH);
        }
        self.research = self.research.max(0.0);
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_never_below_one() {
        let mut tech = Tech::at_level(3);
        assert!((tech.efficiency - 1.3).abs() < 1e-9);
        tech.recompute_efficiency(-1.0);
        assert_eq!(tech.efficiency, 1.0);
    }

    #[test]
    fn test_add_research_carries_over() {
        let mut tech = Tech::at_level(2);
        tech.research = 90.0;
        let reached = tech.add_research(130.0, 10);
        assert_eq!(reached, vec![3, 4]);
        assert!((tech.research - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_research_saturates_at_max_level() {
        let mut tech = Tech::at_level(10);
        let reached = tech.add_research(250.0, 10);
        assert!(reached.is_empty());
        assert_eq!(tech.level, 10);
        assert_eq!(tech.research, MAX_RESEARCH);
    }
}
