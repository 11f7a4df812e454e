//! EventInjector - weighted random events drawn from a data table
//!
//! The catalogue is plain data (built-in default or TOML) so the odds and
//! effects can be tuned and tested without touching call sites. All
//! randomness comes from the RNG passed in.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{EventConfig, TechConfig};
use crate::core::error::{EngineError, Result};
use crate::core::types::Tick;
use crate::tier::{AbstractTier, EventKind};

/// Events the injector can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogueEvent {
    Plague,
    War,
    GoldenAge,
    Breakthrough,
    Discovery,
    Unrest,
    Boom,
    Shortage,
    Pandemic,
}

impl CatalogueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CatalogueEvent::Plague => EventKind::Plague,
            CatalogueEvent::War => EventKind::War,
            CatalogueEvent::GoldenAge => EventKind::GoldenAge,
            CatalogueEvent::Breakthrough => EventKind::Breakthrough,
            CatalogueEvent::Discovery => EventKind::Discovery,
            CatalogueEvent::Unrest => EventKind::Unrest,
            CatalogueEvent::Boom => EventKind::Boom,
            CatalogueEvent::Shortage => EventKind::Shortage,
            CatalogueEvent::Pandemic => EventKind::Pandemic,
        }
    }
}

/// One-shot deltas at severity 1.0; scaled linearly by the rolled severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEffect {
    /// Fractional population change (-0.1 = lose 10%)
    pub population_fraction: f64,
    /// Fractional change of every stockpile
    pub stockpile_fraction: f64,
    /// Tech research points
    pub research_delta: f64,
    pub economic: f64,
    pub social: f64,
    pub infrastructure: f64,
    pub happiness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub event: CatalogueEvent,
    pub weight: f64,
    pub description: String,
    #[serde(default)]
    pub effect: EventEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCatalogue {
    pub events: Vec<EventTemplate>,
}

fn template(event: CatalogueEvent, weight: f64, description: &str, effect: EventEffect) -> EventTemplate {
    EventTemplate { event, weight, description: description.to_string(), effect }
}

impl Default for EventCatalogue {
    fn default() -> Self {
        use CatalogueEvent::*;
        Self {
            events: vec![
                template(Plague, 8.0, "Plague sweeps through", EventEffect {
                    population_fraction: -0.15,
                    economic: -5.0,
                    social: -5.0,
                    happiness: -10.0,
                    ..Default::default()
                }),
                template(War, 10.0, "War breaks out", EventEffect {
                    population_fraction: -0.05,
                    stockpile_fraction: -0.2,
                    economic: -10.0,
                    social: -10.0,
                    infrastructure: -8.0,
                    happiness: -10.0,
                    ..Default::default()
                }),
                template(GoldenAge, 6.0, "A golden age begins", EventEffect {
                    economic: 8.0,
                    social: 8.0,
                    happiness: 12.0,
                    ..Default::default()
                }),
                template(Breakthrough, 6.0, "Scholars make a breakthrough", EventEffect {
                    research_delta: 40.0,
                    ..Default::default()
                }),
                template(Discovery, 10.0, "New deposits discovered", EventEffect {
                    research_delta: 15.0,
                    stockpile_fraction: 0.1,
                    happiness: 3.0,
                    ..Default::default()
                }),
                template(Unrest, 12.0, "Unrest in the streets", EventEffect {
                    economic: -3.0,
                    social: -12.0,
                    happiness: -8.0,
                    ..Default::default()
                }),
                template(Boom, 10.0, "Trade boom", EventEffect {
                    stockpile_fraction: 0.25,
                    economic: 10.0,
                    happiness: 5.0,
                    ..Default::default()
                }),
                template(Shortage, 12.0, "Stores spoil", EventEffect {
                    stockpile_fraction: -0.3,
                    economic: -8.0,
                    happiness: -5.0,
                    ..Default::default()
                }),
                template(Pandemic, 2.0, "Pandemic", EventEffect {
                    population_fraction: -0.35,
                    economic: -10.0,
                    social: -10.0,
                    happiness: -15.0,
                    ..Default::default()
                }),
            ],
        }
    }
}

impl EventCatalogue {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let catalogue: EventCatalogue = toml::from_str(content)?;
        catalogue.validate()?;
        Ok(catalogue)
    }

    pub fn validate(&self) -> Result<()> {
        if self.events.is_empty() {
            return Err(EngineError::InvalidConfig("event catalogue is empty".into()));
        }
        if self.events.iter().any(|e| !(e.weight.is_finite() && e.weight >= 0.0)) {
            return Err(EngineError::InvalidConfig("event weights must be finite and non-negative".into()));
        }
        if self.events.iter().all(|e| e.weight == 0.0) {
            return Err(EngineError::InvalidConfig("at least one event weight must be positive".into()));
        }
        Ok(())
    }

    pub fn get(&self, event: CatalogueEvent) -> Option<&EventTemplate> {
        self.events.iter().find(|e| e.event == event)
    }

    /// Selection probability of each entry
    pub fn probabilities(&self) -> Vec<(CatalogueEvent, f64)> {
        let total: f64 = self.events.iter().map(|e| e.weight).sum();
        self.events
            .iter()
            .map(|e| (e.event, if total > 0.0 { e.weight / total } else { 0.0 }))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct EventInjector {
    catalogue: EventCatalogue,
    distribution: WeightedIndex<f64>,
    config: EventConfig,
    tech: TechConfig,
}

impl EventInjector {
    pub fn new(catalogue: EventCatalogue, config: EventConfig, tech: TechConfig) -> Result<Self> {
        catalogue.validate()?;
        let distribution = WeightedIndex::new(catalogue.events.iter().map(|e| e.weight))
            .map_err(|e| EngineError::InvalidConfig(format!("event weights: {}", e)))?;
        Ok(Self { catalogue, distribution, config, tech })
    }

    pub fn catalogue(&self) -> &EventCatalogue {
        &self.catalogue
    }

    /// Chance that at least one event fires during `dt_years`
    pub fn event_probability(&self, dt_years: f64) -> f64 {
        if dt_years <= 0.0 {
            return 0.0;
        }
        1.0 - (-self.config.annual_event_rate.max(0.0) * dt_years).exp()
    }

    /// Roll for an event over `dt_years`; returns the logged event id if one fired
    pub fn maybe_inject<R: Rng>(&self, tier: &mut AbstractTier, dt_years: f64, tick: Tick, rng: &mut R) -> Option<u64> {
        let p = self.event_probability(dt_years);
        if p <= 0.0 || rng.gen::<f64>() >= p {
            return None;
        }
        Some(self.inject(tier, tick, rng))
    }

    /// Draw an event and a severity and apply them
    pub fn inject<R: Rng>(&self, tier: &mut AbstractTier, tick: Tick, rng: &mut R) -> u64 {
        let index = self.distribution.sample(rng);
        let severity = if self.config.max_severity > self.config.min_severity {
            rng.gen_range(self.config.min_severity..=self.config.max_severity)
        } else {
            self.config.min_severity
        };
        self.apply(tier, &self.catalogue.events[index], severity, tick)
    }

    /// Apply one template at a given severity; deterministic
    pub fn apply(&self, tier: &mut AbstractTier, template: &EventTemplate, severity: f64, tick: Tick) -> u64 {
        let s = severity.clamp(0.0, 1.0);
        let effect = &template.effect;

        if effect.population_fraction != 0.0 {
            tier.population.apply_fraction((effect.population_fraction * s).max(-1.0));
            // Population shocks must not leave more believers than people
            tier.enforce_belief_bound();
        }
        if effect.stockpile_fraction != 0.0 {
            tier.economy.scale_stockpiles((1.0 + effect.stockpile_fraction * s).max(0.0));
        }
        if effect.research_delta > 0.0 {
            let reached = tier.tech.add_research(effect.research_delta * s, self.tech.max_level);
            if !reached.is_empty() {
                tier.tech.recompute_efficiency(self.tech.efficiency_per_level);
                for level in reached {
                    tier.log_event(tick, EventKind::TechBreakthrough { level }, format!("{} reached tech level {}", tier.name, level), 0.5);
                }
            }
        }
        tier.stability.adjust(
            effect.economic * s,
            effect.social * s,
            effect.infrastructure * s,
            effect.happiness * s,
        );

        tracing::debug!(tier = %tier.id, event = template.event.kind().label(), severity = s, "event injected");
        let description = format!("{} in {} (severity {:.2})", template.description, tier.name, s);
        tier.log_event(tick, template.event.kind(), description, s)
    }
}
