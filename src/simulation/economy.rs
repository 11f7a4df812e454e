//! Stockpile integration with shortage truncation

use crate::core::config::EconomyConfig;
use crate::core::types::{Resource, Tick};
use crate::tier::{AbstractTier, EventKind, StabilityPenalty};

/// A resource whose demand could not be fully met this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortage {
    pub resource: Resource,
    /// Fraction of this tick's demand that went unmet, in (0, 1]
    pub unmet_fraction: f64,
}

/// Integrate stockpiles over `dt_years`. Consumption beyond the available
/// supply is truncated: the stockpile stops at zero and a penalty is recorded.
pub fn update_economy(tier: &mut AbstractTier, dt_years: f64, tick: Tick, config: &EconomyConfig) -> Vec<Shortage> {
    let mut shortages = Vec::new();
    if dt_years <= 0.0 {
        return shortages;
    }

    let efficiency = tier.tech.efficiency;
    let previously_short: Vec<Resource> = Resource::ALL
        .into_iter()
        .filter(|r| tier.economy.shortfall(*r) > 0.0)
        .collect();
    tier.economy.clear_shortfalls();

    for resource in tier.economy.resources() {
        let stock = tier.economy.stockpile(resource);
        let supplied = tier.economy.production(resource) * efficiency * dt_years;
        let demand = tier.economy.consumption(resource) * efficiency * dt_years;
        let next = stock + supplied - demand;

        if next >= 0.0 {
            tier.economy.set_stockpile(resource, next);
            continue;
        }

        let unmet_fraction = if demand > 0.0 { ((demand - stock - supplied) / demand).clamp(0.0, 1.0) } else { 0.0 };
        tier.economy.set_stockpile(resource, 0.0);
        tier.economy.record_shortfall(resource, unmet_fraction);

        // Scaled by dt so a year of minute ticks costs as much as one yearly tick
        let points = config.shortage_penalty * unmet_fraction * dt_years.min(1.0);
        tier.stability.apply_penalty(
            StabilityPenalty::ResourceShortage { resource, unmet_fraction, points },
            config.max_recent_penalties,
        );

        if !previously_short.contains(&resource) {
            tier.log_event(
                tick,
                EventKind::ResourceShortage { resource },
                format!("{:?} ran out; {:.0}% of demand unmet", resource, unmet_fraction * 100.0),
                unmet_fraction,
            );
            tracing::debug!(tier = %tier.id, ?resource, unmet_fraction, "resource shortage");
        }
        shortages.push(Shortage { resource, unmet_fraction });
    }

    shortages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TierId, TierRank};

    fn tier() -> AbstractTier {
        AbstractTier::new(TierId(1), "Mill", TierRank::Zone, 100.0, 1_000.0).unwrap()
    }

    #[test]
    fn test_surplus_accumulates_with_efficiency() {
        let mut t = tier().with_tech_level(5).with_rates(Resource::Stone, 10.0, 4.0).unwrap();
        let shortages = update_economy(&mut t, 2.0, 0, &EconomyConfig::default());
        assert!(shortages.is_empty());
        // (10 - 4) * 1.5 * 2
        assert!((t.economy.stockpile(Resource::Stone) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_wood_shortage_stops_at_zero() {
        let mut t = tier()
            .with_stockpile(Resource::Wood, 10.0)
            .with_rates(Resource::Wood, 0.0, 50.0)
            .unwrap();
        let before = t.stability.economic();
        let shortages = update_economy(&mut t, 1.0, 0, &EconomyConfig::default());

        assert_eq!(t.economy.stockpile(Resource::Wood), 0.0);
        assert_eq!(shortages.len(), 1);
        assert!((shortages[0].unmet_fraction - 0.8).abs() < 1e-9);
        assert!(t.stability.economic() < before);
        assert!(t
            .stability
            .recent_penalties()
            .any(|p| matches!(p, StabilityPenalty::ResourceShortage { resource: Resource::Wood, .. })));
        assert_eq!(t.event_log().events_of("resource_shortage").count(), 1);
    }

    #[test]
    fn test_ongoing_shortage_logged_once() {
        let mut t = tier().with_rates(Resource::Water, 1.0, 5.0).unwrap();
        for tick in 0..5 {
            update_economy(&mut t, 0.1, tick, &EconomyConfig::default());
        }
        assert_eq!(t.event_log().events_of("resource_shortage").count(), 1);
        assert!(t.stability.recent_penalties().count() >= 5);
        assert!(t.economy.deficit_ratio() > 0.0);
    }
}
