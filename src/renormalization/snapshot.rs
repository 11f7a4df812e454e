//! Data exchanged with the entity-simulation engine

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Resource, Tick, TierId};
use crate::tier::{Building, NamedEntity, PreservedEntities};

/// A discrete event reported by the entity engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteEvent {
    /// Set when the event originally came from this tier's log
    pub id: Option<u64>,
    pub tick: Tick,
    pub description: String,
    pub severity: f64,
}

/// Recent conflict and need data, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilitySignals {
    pub need_satisfaction: f64,
    pub conflict_rate: f64,
    pub infrastructure_condition: f64,
    pub contentment: f64,
}

impl Default for StabilitySignals {
    fn default() -> Self {
        Self {
            need_satisfaction: 0.5,
            conflict_rate: 0.5,
            infrastructure_condition: 0.5,
            contentment: 0.5,
        }
    }
}

/// Read-only snapshot of an active tier, taken on zoom-out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub population: f64,
    pub named_entities: Vec<NamedEntity>,
    pub buildings: Vec<Building>,
    pub recent_events: Vec<DiscreteEvent>,

    pub stockpiles: BTreeMap<Resource, f64>,
    /// Amounts produced over the observation window
    pub production_totals: BTreeMap<Resource, f64>,
    /// Amounts consumed over the observation window
    pub consumption_totals: BTreeMap<Resource, f64>,
    /// Simulated years the totals cover
    pub window_years: f64,

    pub signals: StabilitySignals,
    pub believers: BTreeMap<String, f64>,
    pub temples: BTreeMap<String, u32>,
    pub tech_level: u8,
    pub research: f64,
}

/// Target sub-scores handed to the entity engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityComponents {
    pub economic: f64,
    pub social: f64,
    pub infrastructure: f64,
    pub happiness: f64,
}

/// Aggregates the entity engine must reproduce when it instantiates a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomInConstraints {
    pub tier_id: TierId,
    pub target_population: f64,
    /// Believer share of the population per deity
    pub belief_distribution: BTreeMap<String, f64>,
    pub temples: BTreeMap<String, u32>,
    pub tech_level: u8,
    pub research: f64,
    /// Target `overall` stability
    pub stability_target: f64,
    pub stability_components: StabilityComponents,
    pub stockpiles: BTreeMap<Resource, f64>,
    /// Yearly rates
    pub production: BTreeMap<Resource, f64>,
    pub consumption: BTreeMap<Resource, f64>,
    /// Entities, buildings and events that must exist again
    pub preserved: PreservedEntities,
    /// Individually tracked specialists to instantiate
    pub specialists: Vec<NamedEntity>,
}

impl EntitySnapshot {
    /// The snapshot a perfectly compliant entity engine would report right
    /// after instantiating `constraints`, over a one-year window
    pub fn from_constraints(constraints: &ZoomInConstraints) -> Self {
        let population = constraints.target_population;
        let mut named_entities = constraints.preserved.entities.clone();
        for specialist in &constraints.specialists {
            if !named_entities.iter().any(|e| e.id == specialist.id) {
                named_entities.push(specialist.clone());
            }
        }
        let c = &constraints.stability_components;

        Self {
            population,
            named_entities,
            buildings: constraints.preserved.buildings.clone(),
            recent_events: constraints
                .preserved
                .events
                .iter()
                .map(|e| DiscreteEvent {
                    id: Some(e.id),
                    tick: e.tick,
                    description: e.description.clone(),
                    severity: e.severity,
                })
                .collect(),
            stockpiles: constraints.stockpiles.clone(),
            production_totals: constraints.production.clone(),
            consumption_totals: constraints.consumption.clone(),
            window_years: 1.0,
            signals: StabilitySignals {
                need_satisfaction: c.economic / 100.0,
                conflict_rate: 1.0 - c.social / 100.0,
                infrastructure_condition: c.infrastructure / 100.0,
                contentment: c.happiness / 100.0,
            },
            believers: constraints
                .belief_distribution
                .iter()
                .map(|(deity, share)| (deity.clone(), share * population))
                .collect(),
            temples: constraints.temples.clone(),
            tech_level: constraints.tech_level,
            research: constraints.research,
        }
    }
}
