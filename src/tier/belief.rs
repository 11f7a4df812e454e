//! Belief block of a tier: believers, temples and miracles per deity

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    believers: BTreeMap<String, f64>,
    temples: BTreeMap<String, u32>,
    recent_miracles: BTreeMap<String, f64>,
    /// Mean believer share of sibling tiers, handed down by the parent
    neighbor_influence: BTreeMap<String, f64>,
}

impl Belief {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn believers(&self, deity: &str) -> f64 {
        self.believers.get(deity).copied().unwrap_or(0.0)
    }

    pub fn believer_counts(&self) -> &BTreeMap<String, f64> {
        &self.believers
    }

    pub fn total_believers(&self) -> f64 {
        self.believers.values().sum()
    }

    pub fn set_believers(&mut self, deity: &str, count: f64) {
        let count = if count.is_finite() { count.max(0.0) } else { 0.0 };
        self.believers.insert(deity.to_string(), count);
    }

    pub fn temples(&self, deity: &str) -> u32 {
        self.temples.get(deity).copied().unwrap_or(0)
    }

    pub fn temple_counts(&self) -> &BTreeMap<String, u32> {
        &self.temples
    }

    pub fn total_temples(&self) -> u32 {
        self.temples.values().sum()
    }

    pub fn add_temples(&mut self, deity: &str, count: u32) {
        *self.temples.entry(deity.to_string()).or_insert(0) += count;
    }

    pub fn set_temples(&mut self, deity: &str, count: u32) {
        self.temples.insert(deity.to_string(), count);
    }

    pub fn recent_miracles(&self, deity: &str) -> f64 {
        self.recent_miracles.get(deity).copied().unwrap_or(0.0)
    }

    pub fn record_miracle(&mut self, deity: &str) {
        *self.recent_miracles.entry(deity.to_string()).or_insert(0.0) += 1.0;
    }

    /// Multiply every miracle counter by `factor` (decay)
    pub fn decay_miracles(&mut self, factor: f64) {
        for counter in self.recent_miracles.values_mut() {
            *counter *= factor;
        }
        self.recent_miracles.retain(|_, counter| *counter > 1e-6);
    }

    pub fn neighbor_influence(&self, deity: &str) -> f64 {
        self.neighbor_influence.get(deity).copied().unwrap_or(0.0)
    }

    pub fn set_neighbor_influence(&mut self, influence: BTreeMap<String, f64>) {
        self.neighbor_influence = influence;
    }

    /// Every deity with believers, temples, miracles or neighbour pressure
    pub fn deities(&self) -> BTreeSet<String> {
        self.believers
            .keys()
            .chain(self.temples.keys())
            .chain(self.recent_miracles.keys())
            .chain(self.neighbor_influence.keys())
            .cloned()
            .collect()
    }

    /// Believer share of a population per deity
    pub fn shares(&self, population: f64) -> BTreeMap<String, f64> {
        self.believers
            .iter()
            .map(|(deity, count)| {
                let share = if population > 0.0 { count / population } else { 0.0 };
                (deity.clone(), share)
            })
            .collect()
    }

    /// Multiply every believer count by `factor`, floored at zero
    pub fn scale(&mut self, factor: f64) {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 0.0 };
        for count in self.believers.values_mut() {
            *count *= factor;
        }
    }

    /// Scale believers down so their sum never exceeds `population`
    ///
    /// Returns the number of believers removed, if any.
    pub fn enforce_bound(&mut self, population: f64) -> Option<f64> {
        let total = self.total_believers();
        let population = population.max(0.0);
        if total <= population {
            return None;
        }
        let scale = if total > 0.0 { population / total } else { 0.0 };
        for count in self.believers.values_mut() {
            *count *= scale;
        }
        // Guard against rounding leaving the sum a hair above the bound
        let remaining = self.total_believers();
        if remaining > population && remaining > 0.0 {
            let fix = population / remaining;
            for count in self.believers.values_mut() {
                *count *= fix;
            }
        }
        Some(total - self.total_believers())
    }
}
