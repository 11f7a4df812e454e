//! Run output and serialization

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::{SimulationController, SimulationHistory, TickReport, TierSummary};
use crate::core::error::{EngineError, Result};

/// Complete output of a headless run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub summary: TierSummary,
    pub history: SimulationHistory,
    pub statistics: RunStats,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub ticks: u64,
    pub simulated_years: f64,
    pub simulation_time_ms: u64,
    pub events: usize,
    pub shortages: usize,
    pub tech_levels: usize,
    pub scientists_emerged: usize,
    pub papers_published: usize,
    pub routes_opened: usize,
    pub trade_volume: f64,
}

impl RunStats {
    pub fn from_reports(reports: &[TickReport]) -> Self {
        let mut stats = Self { ticks: reports.len() as u64, ..Default::default() };
        for r in reports {
            stats.events += r.events;
            stats.shortages += r.shortages;
            stats.tech_levels += r.tech_levels;
            stats.scientists_emerged += r.scientists_emerged;
            stats.papers_published += r.papers_published;
            stats.routes_opened += r.routes_opened;
            stats.trade_volume += r.trade_volume;
        }
        stats
    }
}

impl SimulationOutput {
    pub fn new(controller: &SimulationController, reports: &[TickReport], elapsed: Duration) -> Result<Self> {
        let root = controller.arena().root_id();
        let summary = controller.get_tier_summary(root).ok_or(EngineError::TierNotFound(root))?;

        let mut statistics = RunStats::from_reports(reports);
        statistics.simulated_years = controller.simulated_years();
        statistics.simulation_time_ms = elapsed.as_millis() as u64;

        Ok(Self {
            summary,
            history: controller.get_history().clone(),
            statistics,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let s = &self.summary;
        format!(
            "Simulated {} ticks ({:.2} years at {}) in {}ms\n\
             Population {:.0} across {} tiers, stability {:.1}, max tech level {}\n\
             {} events, {} shortages, {} scientists emerged, {} papers published, {} trade routes",
            self.statistics.ticks,
            self.statistics.simulated_years,
            s.rank.name(),
            self.statistics.simulation_time_ms,
            s.population,
            s.tier_count(),
            s.stability,
            s.max_tech_level,
            self.statistics.events,
            self.statistics.shortages,
            self.statistics.scientists_emerged,
            self.statistics.papers_published,
            s.trade_routes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::NullEntityEngine;
    use crate::core::config::EngineConfig;
    use crate::tier::definition::demo_world;

    #[test]
    fn test_output_serializes() {
        let config = EngineConfig::default();
        let arena = demo_world(&config.stability).unwrap();
        let mut controller = SimulationController::new(arena, config, Box::new(NullEntityEngine::new()), 1).unwrap();
        let reports = controller.run(5);

        let output = SimulationOutput::new(&controller, &reports, Duration::from_millis(3)).unwrap();
        assert_eq!(output.statistics.ticks, 5);
        assert!(output.summary().contains("Simulated 5 ticks"));

        let json = output.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["statistics"]["ticks"], 5);
    }
}
