//! Economy block of a tier: stockpiles and yearly production/consumption rates

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::Resource;

/// Share of a non-vital shortage that counts toward the population deficit
const NON_VITAL_DEFICIT_WEIGHT: f64 = 0.25;

/// Stockpiles plus yearly production and consumption rates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Economy {
    stockpiles: BTreeMap<Resource, f64>,
    production: BTreeMap<Resource, f64>,
    consumption: BTreeMap<Resource, f64>,
    /// Unmet fraction of demand per resource on the last update
    shortfall: BTreeMap<Resource, f64>,
}

fn check_rate(resource: Resource, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidRate { resource, value })
    }
}

impl Economy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the yearly production rate; negative or non-finite rates are rejected
    pub fn set_production(&mut self, resource: Resource, rate: f64) -> Result<()> {
        check_rate(resource, rate)?;
        self.production.insert(resource, rate);
        Ok(())
    }

    /// Set the yearly consumption rate; negative or non-finite rates are rejected
    pub fn set_consumption(&mut self, resource: Resource, rate: f64) -> Result<()> {
        check_rate(resource, rate)?;
        self.consumption.insert(resource, rate);
        Ok(())
    }

    pub fn production(&self, resource: Resource) -> f64 {
        self.production.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn consumption(&self, resource: Resource) -> f64 {
        self.consumption.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn stockpile(&self, resource: Resource) -> f64 {
        self.stockpiles.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn stockpiles(&self) -> &BTreeMap<Resource, f64> {
        &self.stockpiles
    }

    pub fn production_rates(&self) -> &BTreeMap<Resource, f64> {
        &self.production
    }

    pub fn consumption_rates(&self) -> &BTreeMap<Resource, f64> {
        &self.consumption
    }

    /// Set a stockpile directly, clamped to >= 0
    pub fn set_stockpile(&mut self, resource: Resource, amount: f64) {
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.stockpiles.insert(resource, amount);
    }

    /// Add to a stockpile (negative amounts withdraw), clamped to >= 0
    pub fn add_stockpile(&mut self, resource: Resource, amount: f64) {
        let current = self.stockpile(resource);
        self.set_stockpile(resource, current + amount);
    }

    /// Withdraw up to `amount`, returns the amount actually removed
    pub fn withdraw(&mut self, resource: Resource, amount: f64) -> f64 {
        let current = self.stockpile(resource);
        let removed = amount.max(0.0).min(current);
        self.stockpiles.insert(resource, current - removed);
        removed
    }

    /// Scale every stockpile by `factor` (events), clamped to >= 0
    pub fn scale_stockpiles(&mut self, factor: f64) {
        let factor = factor.max(0.0);
        for amount in self.stockpiles.values_mut() {
            *amount *= factor;
        }
    }

    /// Yearly production minus consumption
    pub fn net_rate(&self, resource: Resource) -> f64 {
        self.production(resource) - self.consumption(resource)
    }

    /// Every resource with a stockpile or a rate
    pub fn resources(&self) -> BTreeSet<Resource> {
        self.stockpiles
            .keys()
            .chain(self.production.keys())
            .chain(self.consumption.keys())
            .copied()
            .collect()
    }

    pub fn total_production(&self) -> f64 {
        self.production.values().sum()
    }

    pub fn total_consumption(&self) -> f64 {
        self.consumption.values().sum()
    }

    pub fn total_stockpile(&self) -> f64 {
        self.stockpiles.values().sum()
    }

    pub fn record_shortfall(&mut self, resource: Resource, unmet_fraction: f64) {
        if unmet_fraction > 0.0 {
            self.shortfall.insert(resource, unmet_fraction.clamp(0.0, 1.0));
        } else {
            self.shortfall.remove(&resource);
        }
    }

    pub fn shortfall(&self, resource: Resource) -> f64 {
        self.shortfall.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn clear_shortfalls(&mut self) {
        self.shortfall.clear();
    }

    /// Unmet-demand ratio in [0, 1] used to suppress population growth
    ///
    /// Vital shortages count fully, others at a quarter weight.
    pub fn deficit_ratio(&self) -> f64 {
        self.shortfall
            .iter()
            .map(|(resource, unmet)| {
                if resource.is_vital() {
                    *unmet
                } else {
                    unmet * NON_VITAL_DEFICIT_WEIGHT
                }
            })
            .fold(0.0, f64::max)
    }

    /// Worst yearly shortfall of production against consumption across vital resources, in [0, 1]
    pub fn net_deficit_ratio(&self) -> f64 {
        self.consumption
            .iter()
            .filter(|(resource, consumed)| resource.is_vital() && **consumed > 0.0)
            .map(|(resource, consumed)| ((consumed - self.production(*resource)).max(0.0) / consumed).min(1.0))
            .fold(0.0, f64::max)
    }

    /// Deficit that drives population growth: recorded shortages or a vital net deficit, whichever is worse
    pub fn growth_deficit(&self) -> f64 {
        self.deficit_ratio().max(self.net_deficit_ratio())
    }

    /// Fraction of tracked resources whose net rate is non-negative (1.0 when empty)
    pub fn balance_score(&self) -> f64 {
        let resources = self.resources();
        if resources.is_empty() {
            return 1.0;
        }
        let balanced = resources.iter().filter(|r| self.net_rate(**r) >= 0.0).count();
        balanced as f64 / resources.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rates_rejected() {
        let mut economy = Economy::new();
        assert!(economy.set_consumption(Resource::Wood, -5.0).is_err());
        assert!(economy.set_production(Resource::Wood, f64::NAN).is_err());
        assert_eq!(economy.consumption(Resource::Wood), 0.0);
    }

    #[test]
    fn test_stockpile_never_negative() {
        let mut economy = Economy::new();
        economy.set_stockpile(Resource::Food, 10.0);
        economy.add_stockpile(Resource::Food, -25.0);
        assert_eq!(economy.stockpile(Resource::Food), 0.0);
    }

    #[test]
    fn test_withdraw_caps_at_available() {
        let mut economy = Economy::new();
        economy.set_stockpile(Resource::Stone, 30.0);
        assert_eq!(economy.withdraw(Resource::Stone, 50.0), 30.0);
        assert_eq!(economy.stockpile(Resource::Stone), 0.0);
    }

    #[test]
    fn test_deficit_ratio_weights_vital_resources() {
        let mut economy = Economy::new();
        economy.record_shortfall(Resource::Wood, 0.8);
        assert!((economy.deficit_ratio() - 0.2).abs() < 1e-12);
        economy.record_shortfall(Resource::Food, 0.5);
        assert_eq!(economy.deficit_ratio(), 0.5);
    }

    #[test]
    fn test_net_deficit_ratio_counts_vital_resources_only() {
        let mut economy = Economy::new();
        economy.set_production(Resource::Wood, 0.0).unwrap();
        economy.set_consumption(Resource::Wood, 100.0).unwrap();
        assert_eq!(economy.net_deficit_ratio(), 0.0);

        economy.set_production(Resource::Food, 250.0).unwrap();
        economy.set_consumption(Resource::Food, 1_000.0).unwrap();
        economy.set_stockpile(Resource::Food, 1e9);
        assert!((economy.net_deficit_ratio() - 0.75).abs() < 1e-12);
        assert!((economy.growth_deficit() - 0.75).abs() < 1e-12);

        economy.record_shortfall(Resource::Food, 0.9);
        assert_eq!(economy.growth_deficit(), 0.9);
    }

    #[test]
    fn test_balance_score() {
        let mut economy = Economy::new();
        assert_eq!(economy.balance_score(), 1.0);
        economy.set_production(Resource::Food, 10.0).unwrap();
        economy.set_consumption(Resource::Wood, 10.0).unwrap();
        assert_eq!(economy.balance_score(), 0.5);
    }
}
