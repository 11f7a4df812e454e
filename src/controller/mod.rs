//! SimulationController - one engine tick across the whole hierarchy
//!
//! A tick has two phases:
//! 1. Per-tier updates. Each tier only touches its own state, so they run in
//!    parallel above `parallel_threshold` tiers. Every tier gets its own RNG
//!    seeded in arena order, which keeps results identical either way.
//! 2. Parent-mediated aggregation, children before parents: population and
//!    economy rollup, neighbour belief pressure, trade and diplomacy.
//!
//! Zoom commands run between ticks and either complete or leave the tier
//! untouched.

pub mod engine;
pub mod history;
pub mod output;
pub mod summary;

use std::collections::BTreeMap;

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{Tick, TierId, TierMode};
use crate::renormalization::{RenormalizationEngine, ZoomInConstraints};
use crate::research::{PaperCatalogue, ResearchEmergenceSystem};
use crate::simulation::{EventCatalogue, EventInjector, StatisticalSimulator, TradeStabilizer};
use crate::tier::{AbstractTier, Economy, TierArena};

pub use engine::{ActiveFeed, EntityEngine, NullEntityEngine};
pub use history::{HistorySample, SimulationHistory};
pub use output::{RunStats, SimulationOutput};
pub use summary::TierSummary;

/// What one controller tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub shortages: usize,
    pub events: usize,
    pub tech_levels: usize,
    pub scientists_emerged: usize,
    pub papers_published: usize,
    pub routes_opened: usize,
    pub routes_closed: usize,
    pub trade_volume: f64,
}

/// Result of one tier's own update
#[derive(Debug, Default)]
struct TierOutcome {
    shortages: usize,
    events: usize,
    tech_levels: usize,
    emerged: usize,
    published: usize,
    trade_volume: f64,
    /// Population factor an event applied to an inner tier, owed to its leaves
    population_shock: Option<f64>,
}

/// Everything a per-tier update reads; shared across worker threads
struct StepContext<'a> {
    simulator: &'a StatisticalSimulator,
    injector: &'a EventInjector,
    research: &'a ResearchEmergenceSystem,
    feeds: &'a AHashMap<TierId, ActiveFeed>,
    config: &'a EngineConfig,
    tick: Tick,
}

impl StepContext<'_> {
    fn step(&self, tier: &mut AbstractTier, seed: u64, covered: bool) -> TierOutcome {
        let mut outcome = TierOutcome::default();
        // The entity engine owns everything below an active tier
        if covered {
            return outcome;
        }
        let dt = delta_years_for(self.config, tier);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let step = match tier.mode() {
            TierMode::Abstract => {
                let step = self.simulator.advance(tier, dt, self.tick);
                let before = tier.population.total;
                if self.injector.maybe_inject(tier, dt, self.tick, &mut rng).is_some() {
                    outcome.events += 1;
                    // Inner totals are rebuilt from the leaves, so the shock has to land there
                    let after = tier.population.total;
                    if !tier.is_leaf() && before > 0.0 && after != before {
                        outcome.population_shock = Some(after / before);
                    }
                }
                step
            }
            TierMode::Active => {
                if let Some(feed) = self.feeds.get(&tier.id) {
                    feed.apply(tier);
                    outcome.trade_volume += feed.trade_volume();
                }
                self.simulator.advance_delegated(tier, dt, self.tick)
            }
            TierMode::SemiActive => self.simulator.advance_delegated(tier, dt, self.tick),
        };
        outcome.shortages = step.shortages.len();
        outcome.tech_levels = step.tech_levels.len();

        for year in self.research.advance(tier, dt, self.tick, &mut rng) {
            outcome.emerged += year.emerged.len();
            outcome.published += year.published.len();
        }
        outcome
    }
}

pub struct SimulationController {
    arena: TierArena,
    config: EngineConfig,
    engine: Box<dyn EntityEngine>,
    simulator: StatisticalSimulator,
    injector: EventInjector,
    research: ResearchEmergenceSystem,
    trade: TradeStabilizer,
    renormalization: RenormalizationEngine,
    rng: ChaCha8Rng,
    tick: Tick,
    simulated_years: f64,
    history: SimulationHistory,
}

impl SimulationController {
    pub fn new(mut arena: TierArena, config: EngineConfig, engine: Box<dyn EntityEngine>, seed: u64) -> Result<Self> {
        config.validate()?;
        arena.validate_modes()?;
        for tier in arena.tiers_mut() {
            tier.preserved.events.set_capacity(config.events.log_capacity);
        }

        let injector = EventInjector::new(EventCatalogue::default(), config.events.clone(), config.tech.clone())?;
        Ok(Self {
            simulator: StatisticalSimulator::new(&config),
            injector,
            research: ResearchEmergenceSystem::from_config(&config),
            trade: TradeStabilizer::new(config.trade.clone()),
            renormalization: RenormalizationEngine::from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            simulated_years: 0.0,
            history: SimulationHistory::new(config.controller.history_capacity),
            arena,
            config,
            engine,
        })
    }

    /// Replace the built-in event table
    pub fn with_event_catalogue(mut self, catalogue: EventCatalogue) -> Result<Self> {
        self.injector = EventInjector::new(catalogue, self.config.events.clone(), self.config.tech.clone())?;
        Ok(self)
    }

    /// Replace the built-in paper catalogue
    pub fn with_paper_catalogue(mut self, catalogue: PaperCatalogue) -> Self {
        self.research = ResearchEmergenceSystem::new(self.config.research.clone(), self.config.tech.clone(), catalogue);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn arena(&self) -> &TierArena {
        &self.arena
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    /// Simulated years elapsed at the root tier
    pub fn simulated_years(&self) -> f64 {
        self.simulated_years
    }

    pub fn get_tier_by_id(&self, id: TierId) -> Option<&AbstractTier> {
        self.arena.get(id)
    }

    pub fn get_tier_summary(&self, id: TierId) -> Option<TierSummary> {
        TierSummary::collect(&self.arena, id)
    }

    pub fn get_history(&self) -> &SimulationHistory {
        &self.history
    }

    /// Pre-order (depth, id) list for hierarchy display
    pub fn hierarchy(&self) -> Vec<(usize, TierId)> {
        self.arena.depth_first()
    }

    /// Advance every tier by its own simulated-time delta
    pub fn tick(&mut self) -> TickReport {
        let tick = self.tick;
        let mut report = TickReport { tick, ..Default::default() };

        let seeds: Vec<u64> = (0..self.arena.len()).map(|_| self.rng.gen()).collect();
        let ids: Vec<TierId> = self.arena.iter().map(|t| t.id).collect();
        let covered: Vec<bool> = self.arena.iter().map(|t| self.arena.is_under_active(t.id)).collect();

        let mut feeds = AHashMap::new();
        for (tier, under_active) in self.arena.iter().zip(&covered) {
            if tier.mode() != TierMode::Active || *under_active {
                continue;
            }
            match self.engine.feed(tier.id) {
                Some(feed) => {
                    feeds.insert(tier.id, feed);
                }
                None => tracing::warn!(tier = %tier.id, "active tier has no entity feed"),
            }
        }

        let ctx = StepContext {
            simulator: &self.simulator,
            injector: &self.injector,
            research: &self.research,
            feeds: &feeds,
            config: &self.config,
            tick,
        };

        let tiers = self.arena.tiers_mut();
        let outcomes: Vec<TierOutcome> = if tiers.len() >= self.config.controller.parallel_threshold {
            tiers
                .par_iter_mut()
                .zip(seeds.par_iter())
                .zip(covered.par_iter())
                .map(|((tier, seed), skip)| ctx.step(tier, *seed, *skip))
                .collect()
        } else {
            tiers
                .iter_mut()
                .zip(&seeds)
                .zip(&covered)
                .map(|((tier, seed), skip)| ctx.step(tier, *seed, *skip))
                .collect()
        };

        for outcome in &outcomes {
            report.shortages += outcome.shortages;
            report.events += outcome.events;
            report.tech_levels += outcome.tech_levels;
            report.scientists_emerged += outcome.emerged;
            report.papers_published += outcome.published;
            report.trade_volume += outcome.trade_volume;
        }
        for (id, outcome) in ids.iter().zip(&outcomes) {
            if let Some(factor) = outcome.population_shock {
                self.shock_leaves(*id, factor);
            }
        }

        self.aggregate(&mut report);

        let root = self.arena.root();
        self.simulated_years += delta_years_for(&self.config, root);
        self.history.push(self.sample(tick, report.trade_volume));
        self.tick += 1;

        tracing::debug!(
            tick,
            events = report.events,
            emerged = report.scientists_emerged,
            trade_volume = report.trade_volume,
            "tick complete"
        );
        report
    }

    /// Run `ticks` controller ticks
    pub fn run(&mut self, ticks: u64) -> Vec<TickReport> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    /// Apply an inner tier's population shock to every leaf below it
    fn shock_leaves(&mut self, id: TierId, factor: f64) {
        let leaves = self.arena.leaves_under(id);
        tracing::debug!(tier = %id, factor, leaves = leaves.len(), "population shock passed down");
        for leaf in leaves {
            if let Some(tier) = self.arena.get_mut(leaf) {
                tier.scale_population(factor);
            }
        }
    }

    /// Spread an inner tier's population and economy over its leaves so the
    /// next rollup reproduces them
    ///
    /// Each leaf keeps its share of the old total; with nothing to weight by,
    /// the amount is split evenly.
    fn distribute_to_leaves(&mut self, id: TierId) {
        let leaves = self.arena.leaves_under(id);
        let Some(tier) = self.arena.get(id) else {
            return;
        };
        if leaves.is_empty() {
            return;
        }
        let population = tier.population.total;
        let economy = tier.economy.clone();

        let population_shares = leaf_shares(&self.arena, &leaves, |t| t.population.total);
        let mut resources = economy.resources();
        for t in leaves.iter().filter_map(|l| self.arena.get(*l)) {
            resources.extend(t.economy.resources());
        }
        let economy_shares: Vec<_> = resources
            .into_iter()
            .map(|resource| {
                (
                    resource,
                    leaf_shares(&self.arena, &leaves, |t| t.economy.stockpile(resource)),
                    leaf_shares(&self.arena, &leaves, |t| t.economy.production(resource)),
                    leaf_shares(&self.arena, &leaves, |t| t.economy.consumption(resource)),
                )
            })
            .collect();

        for (index, leaf) in leaves.iter().enumerate() {
            let Some(tier) = self.arena.get_mut(*leaf) else {
                continue;
            };
            let target = population * population_shares[index];
            if tier.population.total > 0.0 {
                tier.scale_population(target / tier.population.total);
            } else {
                tier.population.total = target;
            }
            for (resource, stock, production, consumption) in &economy_shares {
                tier.economy.set_stockpile(*resource, economy.stockpile(*resource) * stock[index]);
                if let Err(e) = tier.economy.set_production(*resource, economy.production(*resource) * production[index]) {
                    tracing::warn!(tier = %leaf, error = %e, "snapshot production not distributed");
                }
                if let Err(e) = tier.economy.set_consumption(*resource, economy.consumption(*resource) * consumption[index]) {
                    tracing::warn!(tier = %leaf, error = %e, "snapshot consumption not distributed");
                }
            }
        }
        tracing::debug!(tier = %id, population, leaves = leaves.len(), "snapshot distributed to leaves");
    }

    /// Children-before-parents pass over every inner tier
    fn aggregate(&mut self, report: &mut TickReport) {
        let tick = self.tick;
        for id in self.arena.post_order() {
            let Some(tier) = self.arena.get(id) else {
                continue;
            };
            if tier.is_leaf() || tier.mode() == TierMode::Active || self.arena.is_under_active(id) {
                continue;
            }
            let mode = tier.mode();

            self.rollup_population(id);
            if mode == TierMode::SemiActive {
                self.rollup_economy(id);
            }
            self.hand_down_belief(id);

            if self.arena.children(id).len() < 2 {
                continue;
            }
            let config = &self.config;
            match self.trade.stabilize(&mut self.arena, id, tick, |t| delta_years_for(config, t)) {
                Ok(trade) => {
                    report.routes_opened += trade.opened;
                    report.routes_closed += trade.closed;
                    report.trade_volume += trade.volume;
                }
                Err(e) => tracing::warn!(tier = %id, error = %e, "trade stabilization skipped"),
            }
        }
    }

    fn rollup_population(&mut self, id: TierId) {
        let (total, capacity) = self
            .arena
            .children(id)
            .iter()
            .filter_map(|c| self.arena.get(*c))
            .fold((0.0, 0.0), |(p, k), c| (p + c.population.total, k + c.population.carrying_capacity));

        if let Some(tier) = self.arena.get_mut(id) {
            tier.population.total = total;
            if capacity > 0.0 {
                tier.population.carrying_capacity = capacity;
            }
            tier.enforce_belief_bound();
        }
    }

    fn rollup_economy(&mut self, id: TierId) {
        let mut economy = Economy::new();
        let mut production: BTreeMap<_, f64> = BTreeMap::new();
        let mut consumption: BTreeMap<_, f64> = BTreeMap::new();
        for child in self.arena.children(id).iter().filter_map(|c| self.arena.get(*c)) {
            for (resource, amount) in child.economy.stockpiles() {
                economy.add_stockpile(*resource, *amount);
            }
            for (resource, rate) in child.economy.production_rates() {
                *production.entry(*resource).or_default() += rate;
            }
            for (resource, rate) in child.economy.consumption_rates() {
                *consumption.entry(*resource).or_default() += rate;
            }
        }
        for (resource, rate) in production {
            if let Err(e) = economy.set_production(resource, rate) {
                tracing::warn!(tier = %id, error = %e, "economy rollup skipped a rate");
            }
        }
        for (resource, rate) in consumption {
            if let Err(e) = economy.set_consumption(resource, rate) {
                tracing::warn!(tier = %id, error = %e, "economy rollup skipped a rate");
            }
        }
        if let Some(tier) = self.arena.get_mut(id) {
            tier.economy = economy;
        }
    }

    /// Give each child the population-weighted believer shares of its siblings
    fn hand_down_belief(&mut self, id: TierId) {
        let children: Vec<TierId> = self.arena.children(id).to_vec();
        let shares: Vec<(TierId, f64, BTreeMap<String, f64>)> = children
            .iter()
            .filter_map(|c| self.arena.get(*c))
            .map(|c| (c.id, c.population.total, c.belief.shares(c.population.total)))
            .collect();

        for (child, _, _) in &shares {
            let mut weighted: BTreeMap<String, f64> = BTreeMap::new();
            let mut weight = 0.0;
            for (_, population, other_shares) in shares.iter().filter(|(other, _, _)| other != child) {
                weight += population;
                for (deity, share) in other_shares {
                    *weighted.entry(deity.clone()).or_default() += share * population;
                }
            }
            let influence = if weight > 0.0 {
                weighted.into_iter().map(|(deity, w)| (deity, w / weight)).collect()
            } else {
                BTreeMap::new()
            };
            if let Some(tier) = self.arena.get_mut(*child) {
                tier.belief.set_neighbor_influence(influence);
            }
        }
    }

    /// World totals over the tiers that currently hold real data
    fn sample(&self, tick: Tick, trade_volume: f64) -> HistorySample {
        let mut population = 0.0;
        let mut production = 0.0;
        let mut consumption = 0.0;
        let mut efficiency = 0.0;
        for tier in self.arena.iter() {
            let reporting = tier.is_leaf() || tier.mode() == TierMode::Active;
            if !reporting || self.arena.is_under_active(tier.id) {
                continue;
            }
            population += tier.population.total;
            production += tier.economy.total_production();
            consumption += tier.economy.total_consumption();
            efficiency += tier.tech.efficiency * tier.population.total;
        }
        HistorySample {
            tick,
            simulated_years: self.simulated_years,
            population,
            production,
            consumption,
            trade_volume,
            efficiency: if population > 0.0 { efficiency / population } else { 1.0 },
        }
    }

    /// Hand an abstract tier to the entity engine.
    ///
    /// On rejection the tier and its ancestors are left exactly as they were.
    pub fn zoom_in(&mut self, id: TierId) -> Result<ZoomInConstraints> {
        let tier = self.arena.get(id).ok_or(EngineError::TierNotFound(id))?;
        if tier.mode() != TierMode::Abstract {
            return Err(EngineError::InvalidModeTransition { tier: id, from: tier.mode(), to: TierMode::Active });
        }
        if self.arena.is_under_active(id) {
            return Err(EngineError::ModeInvariant { tier: id, mode: TierMode::Active });
        }

        let constraints = self.renormalization.zoom_in(tier);
        if let Err(reason) = self.engine.instantiate(&constraints) {
            tracing::warn!(tier = %id, %reason, "zoom-in rejected");
            return Err(EngineError::ZoomRejected { tier: id, reason });
        }

        for ancestor in self.arena.ancestors(id) {
            if let Some(t) = self.arena.get_mut(ancestor) {
                t.set_mode(TierMode::SemiActive);
            }
        }
        if let Some(t) = self.arena.get_mut(id) {
            t.set_mode(TierMode::Active);
        }

        tracing::info!(
            tier = %id,
            population = constraints.target_population,
            tech_level = constraints.tech_level,
            "zoomed in"
        );
        Ok(constraints)
    }

    /// Take an active tier back from the entity engine
    pub fn zoom_out(&mut self, id: TierId) -> Result<()> {
        let tier = self.arena.get(id).ok_or(EngineError::TierNotFound(id))?;
        if tier.mode() != TierMode::Active {
            return Err(EngineError::InvalidModeTransition { tier: id, from: tier.mode(), to: TierMode::Abstract });
        }

        let snapshot = self
            .engine
            .snapshot(id)
            .map_err(|reason| EngineError::SnapshotUnavailable { tier: id, reason })?;
        let rebuilt = self.renormalization.zoom_out(tier, &snapshot)?;
        self.arena.replace(rebuilt)?;
        self.distribute_to_leaves(id);
        self.engine.release(id);

        // Ancestors stay semi-active while any other branch is still delegated
        for ancestor in self.arena.ancestors(id) {
            let delegated = self
                .arena
                .children(ancestor)
                .iter()
                .filter_map(|c| self.arena.get(*c))
                .any(|c| c.mode().is_delegated());
            if delegated {
                break;
            }
            if let Some(t) = self.arena.get_mut(ancestor) {
                t.set_mode(TierMode::Abstract);
            }
        }
        Ok(())
    }
}

/// Each leaf's fraction of `value` summed over `leaves`, or an even split when the sum is zero
fn leaf_shares<F>(arena: &TierArena, leaves: &[TierId], value: F) -> Vec<f64>
where
    F: Fn(&AbstractTier) -> f64,
{
    let values: Vec<f64> = leaves
        .iter()
        .map(|l| arena.get(*l).map(&value).unwrap_or(0.0).max(0.0))
        .collect();
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter().map(|v| v / sum).collect()
    } else {
        vec![1.0 / leaves.len().max(1) as f64; leaves.len()]
    }
}

/// Simulated years `tier` advances per controller tick
fn delta_years_for(config: &EngineConfig, tier: &AbstractTier) -> f64 {
    config
        .controller
        .time_scale
        .delta_years(tier.rank, config.controller.wall_tick_minutes)
}
