//! Belief spread, neighbour pressure and decay

use std::collections::BTreeMap;

use crate::core::config::BeliefConfig;
use crate::tier::AbstractTier;

/// Yearly change of one deity's believer share
fn share_rate(
    share: f64,
    total_share: f64,
    temples: u32,
    miracles: f64,
    neighbor: f64,
    config: &BeliefConfig,
) -> f64 {
    let unconverted = (1.0 - total_share).max(0.0);
    let temple_factor = if config.temple_saturation > 0.0 {
        1.0 - (-(temples as f64) / config.temple_saturation).exp()
    } else if temples > 0 {
        1.0
    } else {
        0.0
    };

    let spread = config.spread_rate * (temple_factor + config.miracle_boost * miracles) * share * unconverted;
    let pull = config.neighbor_rate * neighbor * unconverted;

    let sheltered = temples > 0 || miracles > 0.0;
    let decay = config.decay_rate * share * if sheltered { config.sheltered_decay_factor } else { 1.0 };

    spread + pull - decay
}

/// Advance believer counts by `dt_years`, in sub-steps of at most one year
pub fn update_belief(tier: &mut AbstractTier, dt_years: f64, config: &BeliefConfig) {
    if dt_years <= 0.0 {
        return;
    }
    let population = tier.population.total;
    let steps = dt_years.ceil().max(1.0) as usize;
    let step = dt_years / steps as f64;

    for _ in 0..steps {
        if population <= 0.0 {
            break;
        }
        let shares = tier.belief.shares(population);
        let total_share: f64 = shares.values().sum::<f64>().min(1.0);

        let mut next: BTreeMap<String, f64> = BTreeMap::new();
        for deity in tier.belief.deities() {
            let share = shares.get(&deity).copied().unwrap_or(0.0);
            let rate = share_rate(
                share,
                total_share,
                tier.belief.temples(&deity),
                tier.belief.recent_miracles(&deity),
                tier.belief.neighbor_influence(&deity),
                config,
            );
            next.insert(deity, (share + rate * step).max(0.0));
        }
        for (deity, share) in next {
            tier.belief.set_believers(&deity, share * population);
        }
    }

    tier.belief.decay_miracles((-config.miracle_decay_rate * dt_years).exp());
    tier.enforce_belief_bound();
}
