//! Stability drift toward targets implied by the tier's current health

use crate::core::config::StabilityConfig;
use crate::tier::AbstractTier;

/// Where each sub-score is heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityTargets {
    pub economic: f64,
    pub social: f64,
    pub infrastructure: f64,
    pub happiness: f64,
}

pub fn targets(tier: &AbstractTier, config: &StabilityConfig) -> StabilityTargets {
    let deficit = tier.economy.deficit_ratio().clamp(0.0, 1.0);
    let economic = 100.0 * (1.0 - deficit) * (0.5 + 0.5 * tier.economy.balance_score());

    let population = tier.population.total;
    let coverage = if population > 0.0 {
        (tier.belief.total_believers() / population).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let onset = config.crowding_onset.clamp(0.0, 0.999);
    let crowding = ((tier.population.density() - onset) / (1.0 - onset)).clamp(0.0, 1.0);
    let social = 40.0 + 40.0 * coverage + 20.0 * (1.0 - crowding);

    let institutions = (tier.transport_hubs.len() + tier.universities.len()) as f64;
    let infrastructure = (30.0 + 7.0 * tier.tech.level as f64 + 2.0 * institutions).min(100.0);

    let happiness = (economic + social) / 2.0 * (1.0 - 0.5 * deficit);

    StabilityTargets {
        economic: economic.clamp(0.0, 100.0),
        social: social.clamp(0.0, 100.0),
        infrastructure,
        happiness: happiness.clamp(0.0, 100.0),
    }
}

fn step_toward(current: f64, target: f64, max_step: f64) -> f64 {
    (target - current).clamp(-max_step, max_step)
}

/// Move every sub-score toward its target, then update the sustained-stability
/// counter used by research emergence
///
/// Long spans are integrated in slices of at most `max_step_per_slice` points,
/// re-reading the targets each slice, so the result does not depend on how a
/// span of simulated time is split into ticks.
pub fn update_stability(tier: &mut AbstractTier, dt_years: f64, config: &StabilityConfig) {
    if !(dt_years.is_finite() && dt_years > 0.0) {
        return;
    }
    let slice = if config.drift_rate > 0.0 && config.max_step_per_slice > 0.0 {
        config.max_step_per_slice / config.drift_rate
    } else {
        dt_years
    };
    let steps = (dt_years / slice).ceil().max(1.0) as usize;
    let step = dt_years / steps as f64;
    let max_step = config.drift_rate.max(0.0) * step;

    for _ in 0..steps {
        let target = targets(tier, config);
        let s = &tier.stability;
        let deltas = (
            step_toward(s.economic(), target.economic, max_step),
            step_toward(s.social(), target.social, max_step),
            step_toward(s.infrastructure(), target.infrastructure, max_step),
            step_toward(s.happiness(), target.happiness, max_step),
        );
        tier.stability.adjust(deltas.0, deltas.1, deltas.2, deltas.3);

        if tier.stability.overall() >= config.stable_threshold {
            tier.research.stable_years += step;
        } else {
            tier.research.stable_years = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Resource, TierId, TierRank};
    use crate::tier::{Stability, StabilityWeights};

    fn tier() -> AbstractTier {
        AbstractTier::new(TierId(1), "Town", TierRank::Zone, 500.0, 1_000.0)
            .unwrap()
            .with_stability(Stability::uniform(10.0, StabilityWeights::default()))
    }

    #[test]
    fn test_year_moves_drift_rate_points() {
        let config = StabilityConfig::default();
        let mut t = tier();
        update_stability(&mut t, 1.0, &config);
        assert!((t.stability.economic() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_long_tick_matches_many_short_ticks() {
        let config = StabilityConfig::default();
        let mut long = tier();
        let mut short = tier();
        update_stability(&mut long, 3.0, &config);
        for _ in 0..3_000 {
            update_stability(&mut short, 0.001, &config);
        }
        assert!((long.stability.overall() - short.stability.overall()).abs() < 1e-6);
        assert!((long.stability.infrastructure() - short.stability.infrastructure()).abs() < 1e-6);
    }

    #[test]
    fn test_slices_stop_at_the_target() {
        let config = StabilityConfig::default();
        let mut t = tier();
        let target = targets(&t, &config);
        // 50 years is far more drift than any gap, nothing overshoots
        update_stability(&mut t, 50.0, &config);
        assert!((t.stability.infrastructure() - target.infrastructure).abs() < 1e-9);
    }

    #[test]
    fn test_small_dt_moves_proportionally() {
        let config = StabilityConfig::default();
        let mut t = tier();
        update_stability(&mut t, 0.01, &config);
        assert!((t.stability.economic() - 10.1).abs() < 1e-9);
    }

    #[test]
    fn test_converges_to_targets() {
        let config = StabilityConfig::default();
        let mut t = tier();
        for _ in 0..200 {
            update_stability(&mut t, 1.0, &config);
        }
        let target = targets(&t, &config);
        assert!((t.stability.economic() - target.economic).abs() < 1e-6);
        assert!((t.stability.infrastructure() - target.infrastructure).abs() < 1e-6);
    }

    #[test]
    fn test_shortage_lowers_economic_target() {
        let config = StabilityConfig::default();
        let mut t = tier();
        let healthy = targets(&t, &config).economic;
        t.economy.record_shortfall(Resource::Food, 0.5);
        assert!(targets(&t, &config).economic < healthy);
    }

    #[test]
    fn test_stable_years_reset_when_unstable() {
        let config = StabilityConfig::default();
        let mut t = tier().with_stability(Stability::uniform(90.0, StabilityWeights::default()));
        update_stability(&mut t, 1.0, &config);
        assert!((t.research.stable_years - 1.0).abs() < 1e-9);
        t.stability = Stability::uniform(5.0, StabilityWeights::default());
        update_stability(&mut t, 1.0, &config);
        assert_eq!(t.research.stable_years, 0.0);
    }
}
