//! Logistic population growth
//!
//! Uses the closed-form logistic solution rather than an Euler step, so one
//! step of `dt` equals many steps summing to `dt` for a fixed rate.

use crate::core::config::PopulationConfig;
use crate::tier::AbstractTier;

/// Effective yearly growth rate from stability and the vital deficit
pub fn growth_rate(overall_stability: f64, deficit_ratio: f64, config: &PopulationConfig) -> f64 {
    let stability_factor = if config.stability_reference > 0.0 {
        (overall_stability / config.stability_reference).clamp(0.0, 2.0)
    } else {
        1.0
    };
    let deficit = deficit_ratio.clamp(0.0, 1.0);
    config.base_growth_rate * stability_factor * (1.0 - deficit) - deficit * config.deficit_mortality_rate
}

/// Exact solution of dP/dt = rP(1 - P/K) after `dt` years, for P at or below K
pub fn logistic_step(population: f64, capacity: f64, rate: f64, dt_years: f64) -> f64 {
    if population <= 0.0 || capacity <= 0.0 || dt_years <= 0.0 || rate == 0.0 {
        return population.max(0.0);
    }
    let ratio = (capacity - population) / population;
    let next = capacity / (1.0 + ratio * (-rate * dt_years).exp());
    if next.is_finite() {
        next.max(0.0)
    } else {
        0.0
    }
}

/// Advance a leaf tier's population; tiers with children are rolled up instead
pub fn update_population(tier: &mut AbstractTier, dt_years: f64, config: &PopulationConfig) {
    if !tier.is_leaf() || dt_years <= 0.0 {
        return;
    }

    let rate = growth_rate(tier.stability.overall(), tier.economy.growth_deficit(), config);
    let pop = &mut tier.population;
    let capacity = pop.carrying_capacity;

    let mut next = if pop.total > capacity {
        // Excess decays toward K and at least halves every tick
        let excess = pop.total - capacity;
        let factor = (-config.overshoot_decay_rate * dt_years).exp().min(0.5);
        let mut next = capacity + excess * factor;
        if rate < 0.0 {
            next *= (rate * dt_years).exp();
        }
        next
    } else {
        logistic_step(pop.total, capacity, rate, dt_years)
    };

    next = next.min(capacity * (1.0 + config.max_overshoot)).max(0.0);
    pop.total = next;
    pop.growth = rate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Resource, TierId, TierRank};

    fn config() -> PopulationConfig {
        PopulationConfig::default()
    }

    #[test]
    fn test_growth_rate_at_reference() {
        let c = config();
        assert!((growth_rate(50.0, 0.0, &c) - 0.02).abs() < 1e-12);
        assert!((growth_rate(100.0, 0.0, &c) - 0.04).abs() < 1e-12);
        assert!(growth_rate(50.0, 1.0, &c) < 0.0);
    }

    #[test]
    fn test_logistic_approaches_capacity() {
        let mut p = 100.0;
        for _ in 0..2000 {
            p = logistic_step(p, 1000.0, 0.05, 1.0);
        }
        assert!((p - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_logistic_is_step_invariant() {
        let one = logistic_step(1e6, 5e6, 0.03, 10.0);
        let mut many = 1e6;
        for _ in 0..1000 {
            many = logistic_step(many, 5e6, 0.03, 0.01);
        }
        assert!((one - many).abs() / one < 1e-9);
    }

    #[test]
    fn test_overshoot_decays_within_bounded_ticks() {
        let c = config();
        let mut tier = AbstractTier::new(TierId(1), "Crowded", TierRank::Zone, 1_000.0, 1_000.0).unwrap();
        tier.population.total = 1_100.0;
        // A tiny dt still halves the excess every tick
        for _ in 0..20 {
            update_population(&mut tier, 1e-6, &c);
        }
        assert!(tier.population.total - 1_000.0 < 0.001);
    }

    #[test]
    fn test_starvation_shrinks_population_but_never_negative() {
        let c = config();
        let mut tier = AbstractTier::new(TierId(1), "Famine", TierRank::Zone, 1_000.0, 10_000.0)
            .unwrap()
            .with_rates(Resource::Food, 0.0, 100.0)
            .unwrap();
        tier.economy.record_shortfall(Resource::Food, 1.0);
        for _ in 0..500 {
            update_population(&mut tier, 1.0, &c);
        }
        assert!(tier.population.total < 1_000.0);
        assert!(tier.population.total >= 0.0);
        assert!(tier.population.growth < 0.0);
    }

    #[test]
    fn test_net_deficit_turns_growth_negative_despite_stockpile() {
        let c = config();
        let mut tier = AbstractTier::new(TierId(1), "Granary", TierRank::Zone, 50_000.0, 1_000_000.0)
            .unwrap()
            .with_stockpile(Resource::Food, 1e8)
            .with_rates(Resource::Food, 0.0, 1e6)
            .unwrap();
        for _ in 0..10 {
            update_population(&mut tier, 1.0, &c);
        }
        assert!(tier.population.growth < 0.0);
        assert!(tier.population.total < 50_000.0);
    }

    #[test]
    fn test_inner_tiers_are_not_advanced() {
        let c = config();
        let mut tier = AbstractTier::new(TierId(1), "Parent", TierRank::Region, 1_000.0, 10_000.0).unwrap();
        tier.children.push(TierId(2));
        update_population(&mut tier, 1.0, &c);
        assert_eq!(tier.population.total, 1_000.0);
    }
}
