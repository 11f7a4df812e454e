//! RenormalizationEngine - zoom-out (discrete → statistical) and zoom-in
//! (statistical → constraints for the entity engine)
//!
//! Zoom-out discards every individual the entity engine reported except
//! famous entities, major buildings and the most recent events. That loss is
//! permanent. Zoom-in does not create entities; it only emits the aggregates
//! the entity engine has to reproduce.

pub mod snapshot;

use crate::core::config::{EngineConfig, RenormalizationConfig, TechConfig};
use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, TierMode};
use crate::tier::{AbstractTier, Economy, EventKind, PreservedEntities, Stability};

pub use snapshot::{DiscreteEvent, EntitySnapshot, StabilityComponents, StabilitySignals, ZoomInConstraints};

/// Relative tolerance within which a zoom-out/zoom-in round trip must
/// reproduce population, tech level and overall stability
pub const ROUND_TRIP_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct RenormalizationEngine {
    config: RenormalizationConfig,
    tech: TechConfig,
}

impl RenormalizationEngine {
    pub fn new(config: RenormalizationConfig, tech: TechConfig) -> Self {
        Self { config, tech }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.renormalization.clone(), config.tech.clone())
    }

    /// Build an abstract tier from an entity snapshot.
    ///
    /// `template` supplies what the snapshot does not carry: identity, rank,
    /// links, carrying capacity, institutions and research state.
    pub fn zoom_out(&self, template: &AbstractTier, snapshot: &EntitySnapshot) -> Result<AbstractTier> {
        if !(snapshot.population.is_finite() && snapshot.population >= 0.0) {
            return Err(EngineError::InvalidPopulation { tier: template.id, value: snapshot.population });
        }
        if !(snapshot.window_years.is_finite() && snapshot.window_years > 0.0) {
            return Err(EngineError::SnapshotUnavailable {
                tier: template.id,
                reason: format!("observation window must be positive, got {}", snapshot.window_years),
            });
        }

        let mut tier = template.clone();
        tier.set_mode(TierMode::Abstract);
        tier.population.total = snapshot.population;
        tier.population.growth = 0.0;

        // Economy: rates are the observed totals spread over the window
        let mut economy = Economy::new();
        for (resource, amount) in &snapshot.stockpiles {
            economy.set_stockpile(*resource, *amount);
        }
        for (resource, total) in &snapshot.production_totals {
            economy.set_production(*resource, total / snapshot.window_years)?;
        }
        for (resource, total) in &snapshot.consumption_totals {
            economy.set_consumption(*resource, total / snapshot.window_years)?;
        }
        tier.economy = economy;

        let signals = &snapshot.signals;
        tier.stability = Stability::new(
            100.0 * signals.need_satisfaction,
            100.0 * (1.0 - signals.conflict_rate),
            100.0 * signals.infrastructure_condition,
            100.0 * signals.contentment,
            template.stability.weights(),
        );

        tier.tech.level = snapshot.tech_level.min(self.tech.max_level);
        tier.tech.research = snapshot.research.clamp(0.0, 100.0);
        tier.tech.recompute_efficiency(self.tech.efficiency_per_level);

        tier.belief = Default::default();
        for (deity, count) in &snapshot.temples {
            tier.belief.set_temples(deity, *count);
        }
        for (deity, count) in &snapshot.believers {
            tier.belief.set_believers(deity, *count);
        }
        tier.enforce_belief_bound();

        tier.preserved = self.select_preserved(template, snapshot);
        self.demote_specialists(&mut tier, snapshot);

        tracing::info!(
            tier = %tier.id,
            population = tier.population.total,
            preserved_entities = tier.preserved.entities.len(),
            preserved_buildings = tier.preserved.buildings.len(),
            "zoomed out"
        );
        Ok(tier)
    }

    /// Famous entities, major buildings and the most recent events
    fn select_preserved(&self, template: &AbstractTier, snapshot: &EntitySnapshot) -> PreservedEntities {
        let mut preserved = PreservedEntities::new();

        for entity in &snapshot.named_entities {
            let already = template.preserved.entity(entity.id).is_some();
            if already || entity.fame >= self.config.fame_threshold {
                preserved.upsert_entity(entity.clone());
            }
        }
        for building in snapshot.buildings.iter().filter(|b| b.kind.is_major()) {
            preserved.upsert_building(building.clone());
        }

        let mut events = template.preserved.events.clone();
        let mut incoming: Vec<&DiscreteEvent> = snapshot.recent_events.iter().collect();
        incoming.sort_by_key(|e| e.tick);
        for event in incoming {
            if event.id.is_some_and(|id| events.contains(id)) {
                continue;
            }
            events.add_event(template.id, event.tick, EventKind::Recorded, event.description.clone(), event.severity);
        }
        events.truncate_to_recent(self.config.preserved_event_count);
        preserved.events = events;

        preserved
    }

    /// Individually tracked specialists who are not famous enough go back
    /// into aggregate pool counts; those the snapshot no longer reports are gone
    fn demote_specialists(&self, tier: &mut AbstractTier, snapshot: &EntitySnapshot) {
        let scientists = std::mem::take(&mut tier.research.scientists);
        let previously_tracked: Vec<EntityId> = scientists.iter().map(|s| s.id).collect();
        for mut scientist in scientists {
            let Some(reported) = snapshot.named_entities.iter().find(|e| e.id == scientist.id) else {
                continue;
            };
            scientist.fame = reported.fame;
            scientist.current_paper = None;
            if scientist.fame >= self.config.fame_threshold {
                tier.research.scientists.push(scientist);
            } else {
                tier.scientist_pool.add(scientist.rarity_tier, 1);
            }
        }

        // Specialists the entity engine produced on its own join the pool
        for entity in &snapshot.named_entities {
            let known = previously_tracked.contains(&entity.id) || tier.preserved.entity(entity.id).is_some();
            if let (Some(rarity), Some(_)) = (entity.rarity_tier, entity.field) {
                if !known {
                    tier.scientist_pool.add(rarity, 1);
                }
            }
        }
    }

    /// Constraints the entity engine must satisfy to take over this tier
    pub fn zoom_in(&self, tier: &AbstractTier) -> ZoomInConstraints {
        ZoomInConstraints {
            tier_id: tier.id,
            target_population: tier.population.total,
            belief_distribution: tier.belief.shares(tier.population.total),
            temples: tier.belief.temple_counts().clone(),
            tech_level: tier.tech.level,
            research: tier.tech.research,
            stability_target: tier.stability.overall(),
            stability_components: StabilityComponents {
                economic: tier.stability.economic(),
                social: tier.stability.social(),
                infrastructure: tier.stability.infrastructure(),
                happiness: tier.stability.happiness(),
            },
            stockpiles: tier.economy.stockpiles().clone(),
            production: tier.economy.production_rates().clone(),
            consumption: tier.economy.consumption_rates().clone(),
            preserved: tier.preserved.clone(),
            specialists: tier.research.scientists.iter().map(|s| s.to_named_entity()).collect(),
        }
    }
}

/// True if `actual` is within `ROUND_TRIP_TOLERANCE` of `expected`
pub fn within_tolerance(expected: f64, actual: f64) -> bool {
    let scale = expected.abs().max(1.0);
    (expected - actual).abs() <= ROUND_TRIP_TOLERANCE * scale
}
