//! Research accumulation and tech breakthroughs

use crate::core::config::TechConfig;
use crate::core::types::Tick;
use crate::tier::{AbstractTier, EventKind};

/// `research += universities × base_rate × dt`; returns the levels reached
pub fn update_tech(tier: &mut AbstractTier, dt_years: f64, tick: Tick, config: &TechConfig) -> Vec<u8> {
    if dt_years <= 0.0 {
        return Vec::new();
    }
    let points = tier.universities.len() as f64 * config.base_research_rate * dt_years;
    let reached = tier.tech.add_research(points, config.max_level);
    tier.tech.recompute_efficiency(config.efficiency_per_level);

    for level in &reached {
        tracing::debug!(tier = %tier.id, level, "tech breakthrough");
        tier.log_event(
            tick,
            EventKind::TechBreakthrough { level: *level },
            format!("{} reached tech level {}", tier.name, level),
            0.5,
        );
    }
    reached
}
