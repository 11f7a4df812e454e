//! Engine configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other. Rates are per simulated year unless
//! stated otherwise; the controller converts them with the time-scale table.

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::time_scale::TimeScaleTable;
use crate::tier::tech::MAX_TECH_LEVEL;

/// Configuration for every subsystem of the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub population: PopulationConfig,
    pub economy: EconomyConfig,
    pub stability: StabilityConfig,
    pub tech: TechConfig,
    pub belief: BeliefConfig,
    pub events: EventConfig,
    pub trade: TradeConfig,
    pub renormalization: RenormalizationConfig,
    pub research: ResearchConfig,
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Intrinsic logistic growth rate `r` at reference stability
    ///
    /// At 0.02 a small population doubles in roughly 35 years.
    pub base_growth_rate: f64,

    /// Stability `overall` at which growth is neither boosted nor suppressed
    ///
    /// Growth scales with `overall / stability_reference`, capped at 2x.
    pub stability_reference: f64,

    /// Yearly death rate added when vital demand goes completely unmet
    ///
    /// Scaled by the deficit ratio. Large enough to drive `r` negative.
    pub deficit_mortality_rate: f64,

    /// Maximum fraction a population may sit above carrying capacity
    pub max_overshoot: f64,

    /// Yearly decay rate of the excess above carrying capacity
    ///
    /// Regardless of this rate the excess at least halves every tick, so an
    /// overshoot clears in a bounded number of ticks at any time scale.
    pub overshoot_decay_rate: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            base_growth_rate: 0.02,
            stability_reference: 50.0,
            deficit_mortality_rate: 0.08,
            max_overshoot: 0.10,
            overshoot_decay_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Economic stability points lost for a total shortage of one resource
    ///
    /// Scaled by the unmet fraction of demand.
    pub shortage_penalty: f64,

    /// Number of recent stability penalties retained per tier
    pub max_recent_penalties: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            shortage_penalty: 15.0,
            max_recent_penalties: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Weights of the four sub-scores in `overall`; must sum to 1
    pub economic_weight: f64,
    pub social_weight: f64,
    pub infrastructure_weight: f64,
    pub happiness_weight: f64,

    /// Points per simulated year a sub-score drifts toward its target
    pub drift_rate: f64,

    /// Maximum points a sub-score may move in one integration slice
    ///
    /// Long ticks are split into slices of `max_step_per_slice / drift_rate`
    /// years with targets recomputed per slice, so a gigasegment year and a
    /// year of chunk ticks drift the same distance.
    pub max_step_per_slice: f64,

    /// `overall` at or above which a tier accrues sustained-stability years
    pub stable_threshold: f64,

    /// Population / capacity ratio at which crowding starts to hurt social stability
    pub crowding_onset: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            economic_weight: 0.30,
            social_weight: 0.25,
            infrastructure_weight: 0.20,
            happiness_weight: 0.25,
            drift_rate: 10.0,
            max_step_per_slice: 2.0,
            stable_threshold: 60.0,
            crowding_onset: 0.8,
        }
    }
}

impl StabilityConfig {
    pub fn weights(&self) -> [f64; 4] {
        [
            self.economic_weight,
            self.social_weight,
            self.infrastructure_weight,
            self.happiness_weight,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechConfig {
    /// Research points per university per simulated year
    ///
    /// With one university a level takes 25 years at 4.0.
    pub base_research_rate: f64,

    /// Efficiency gained per tech level (`efficiency = 1 + level * this`)
    pub efficiency_per_level: f64,

    /// Highest reachable tech level
    pub max_level: u8,

    /// Research points granted per tier of a published paper
    pub publication_boost: f64,
}

impl Default for TechConfig {
    fn default() -> Self {
        Self {
            base_research_rate: 4.0,
            efficiency_per_level: 0.1,
            max_level: MAX_TECH_LEVEL,
            publication_boost: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeliefConfig {
    /// Yearly spread rate of a faith among the unconverted at full temple coverage
    pub spread_rate: f64,

    /// Temple count at which temple coverage reaches ~63%
    pub temple_saturation: f64,

    /// Yearly rate at which sibling belief shares pull on a tier
    pub neighbor_rate: f64,

    /// Yearly decay of believers with no temples and no recent miracles
    pub decay_rate: f64,

    /// Multiplier on decay while temples or miracles sustain a faith
    pub sheltered_decay_factor: f64,

    /// Extra spread factor per unit of recent-miracle counter
    pub miracle_boost: f64,

    /// Yearly decay rate of the recent-miracle counter
    pub miracle_decay_rate: f64,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            spread_rate: 0.05,
            temple_saturation: 10.0,
            neighbor_rate: 0.02,
            decay_rate: 0.03,
            sheltered_decay_factor: 0.1,
            miracle_boost: 0.5,
            miracle_decay_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Expected random events per tier per simulated year
    pub annual_event_rate: f64,

    /// Bounds of the severity roll
    pub min_severity: f64,
    pub max_severity: f64,

    /// Historical events kept per tier (FIFO eviction)
    pub log_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            annual_event_rate: 0.4,
            min_severity: 0.1,
            max_severity: 1.0,
            log_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Minimum yearly surplus/deficit before a sibling counts as imbalanced
    pub imbalance_threshold: f64,

    /// Maximum yearly volume of a single route
    pub max_route_rate: f64,

    /// Maximum amount a route may move in a single tick
    pub max_transfer_per_tick: f64,

    /// Consecutive balanced ticks before a route closes
    ///
    /// Hysteresis: a route survives short-lived dips in the imbalance.
    pub close_after_ticks: u32,

    /// Opinion points per simulated year a route adds between sibling segments
    pub opinion_gain_per_route: f64,

    /// Yearly decay rate of segment opinions toward neutral
    pub opinion_decay_rate: f64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold: 1.0,
            max_route_rate: 500.0,
            max_transfer_per_tick: 250.0,
            close_after_ticks: 10,
            opinion_gain_per_route: 5.0,
            opinion_decay_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenormalizationConfig {
    /// Fame at or above which a named entity survives a zoom-out
    pub fame_threshold: f64,

    /// Most recent historical events preserved across a zoom-out
    pub preserved_event_count: usize,
}

impl Default for RenormalizationConfig {
    fn default() -> Self {
        Self {
            fame_threshold: 50.0,
            preserved_event_count: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Rarity tiers rolled for individual emergence each simulated year
    pub tracked_rarity_tiers: Vec<u8>,

    /// Yearly base probability of a tier-50 specialist
    pub base_probability_tier50: f64,

    /// log10 drop in base probability per rarity tier
    ///
    /// At 0.14 a tier-100 specialist is 1e-7 as likely as a tier-50 one (1e-8/yr).
    pub probability_decade_per_tier: f64,

    /// Rarity tier whose required population is one billion
    pub population_reference_tier: f64,

    /// Rarity tiers per tenfold increase in required population
    pub population_decade_tiers: f64,

    /// Cap on the population modifier
    pub max_population_modifier: f64,

    /// Rarity tier from which infrastructure is bottlenecked by the weaker input
    pub bottleneck_tier: u8,

    /// Cap on the infrastructure modifier
    pub max_infrastructure_modifier: f64,

    /// Sustained-stability years required per rarity tier
    pub stability_years_per_tier: f64,

    /// Modifier applied when no paper is active near the target tier
    pub inactive_research_penalty: f64,

    /// Fraction of the target tier a paper must reach to count as nearby activity
    pub active_research_fraction: f64,

    /// Yearly probability a pooled specialist retires
    pub pool_attrition_rate: f64,

    /// Highest rarity a university graduate can have; rarer specialists only emerge
    pub graduate_rarity_cap: u8,

    /// Lifespan of an ordinary specialist and of a tier-100 one
    pub base_lifespan: f64,
    pub max_lifespan: f64,

    /// Age range at emergence
    pub min_emergence_age: f64,
    pub max_emergence_age: f64,

    /// Fame gained by each author of a published paper, per ten paper tiers
    pub publication_fame: f64,

    /// Concurrent papers each institution can host
    pub papers_per_institution: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            tracked_rarity_tiers: vec![50, 60, 70, 80, 90, 100],
            base_probability_tier50: 0.1,
            probability_decade_per_tier: 0.14,
            population_reference_tier: 75.0,
            population_decade_tiers: 25.0,
            max_population_modifier: 10.0,
            bottleneck_tier: 80,
            max_infrastructure_modifier: 3.0,
            stability_years_per_tier: 2.0,
            inactive_research_penalty: 0.1,
            active_research_fraction: 0.8,
            pool_attrition_rate: 0.02,
            graduate_rarity_cap: 49,
            base_lifespan: 70.0,
            max_lifespan: 200.0,
            min_emergence_age: 25.0,
            max_emergence_age: 40.0,
            publication_fame: 5.0,
            papers_per_institution: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Real-scale minutes represented by one wall tick
    pub wall_tick_minutes: f64,

    /// Per-rank time multipliers
    pub time_scale: TimeScaleTable,

    /// Minimum simulated tier count before per-tier updates run in parallel
    ///
    /// Below this threshold thread overhead exceeds the benefit.
    pub parallel_threshold: usize,

    /// History samples retained for charting
    pub history_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            wall_tick_minutes: 1.0,
            time_scale: TimeScaleTable::default(),
            parallel_threshold: 64,
            history_capacity: 1000,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing sections keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let weight_sum: f64 = self.stability.weights().iter().sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::InvalidConfig(format!(
                "stability weights must sum to 1.0, got {:.4}",
                weight_sum
            )));
        }
        if self.stability.weights().iter().any(|w| *w < 0.0) {
            return Err(EngineError::InvalidConfig("stability weights must be non-negative".into()));
        }

        if !(self.stability.drift_rate >= 0.0 && self.stability.max_step_per_slice > 0.0) {
            return Err(EngineError::InvalidConfig(
                "stability drift rate must be non-negative and max step positive".into(),
            ));
        }

        if self.population.base_growth_rate < 0.0 || self.population.max_overshoot < 0.0 {
            return Err(EngineError::InvalidConfig(
                "population growth rate and overshoot must be non-negative".into(),
            ));
        }

        if self.events.min_severity > self.events.max_severity || self.events.min_severity < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "severity range [{}, {}] is invalid",
                self.events.min_severity, self.events.max_severity
            )));
        }

        if self.tech.max_level > MAX_TECH_LEVEL {
            return Err(EngineError::InvalidConfig(format!(
                "tech max level {} exceeds {}",
                self.tech.max_level, MAX_TECH_LEVEL
            )));
        }

        if self.events.log_capacity == 0 {
            return Err(EngineError::InvalidConfig("event log capacity must be at least 1".into()));
        }

        if self.research.min_emergence_age > self.research.max_emergence_age {
            return Err(EngineError::InvalidConfig("emergence age range is inverted".into()));
        }

        if self.research.base_lifespan > self.research.max_lifespan {
            return Err(EngineError::InvalidConfig("base lifespan exceeds max lifespan".into()));
        }

        if self.research.tracked_rarity_tiers.iter().any(|t| *t > 100) {
            return Err(EngineError::InvalidConfig("rarity tiers must be within 0-100".into()));
        }

        if !(self.controller.wall_tick_minutes.is_finite() && self.controller.wall_tick_minutes > 0.0) {
            return Err(EngineError::InvalidConfig("wall tick duration must be positive".into()));
        }

        self.controller.time_scale.validate().map_err(EngineError::InvalidConfig)?;

        Ok(())
    }
}
