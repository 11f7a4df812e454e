//! Scenario tests for the statistical simulator and the time-scale table
//!
//! - A one-tick wood shortage truncates to zero and records a penalty
//! - A gigasegment tick equals a year of chunk ticks for stability, population and research
//! - Overshoot above carrying capacity clears in a bounded number of ticks

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata::core::config::EngineConfig;
use strata::core::types::{Resource, TierId, TierRank};
use strata::core::TimeScaleTable;
use strata::research::ResearchEmergenceSystem;
use strata::simulation::{update_population, StatisticalSimulator};
use strata::tier::{AbstractTier, Stability, StabilityPenalty, StabilityWeights, University};

#[test]
fn test_wood_shortage_stops_at_zero_with_penalty() {
    let config = EngineConfig::default();
    let sim = StatisticalSimulator::new(&config);
    let dt = config
        .controller
        .time_scale
        .delta_years(TierRank::Gigasegment, config.controller.wall_tick_minutes);
    assert_eq!(dt, 1.0);

    let mut tier = AbstractTier::new(TierId(1), "Outer Ring", TierRank::Gigasegment, 1e6, 2e6)
        .unwrap()
        .with_stockpile(Resource::Wood, 10.0)
        .with_rates(Resource::Wood, 0.0, 50.0)
        .unwrap();

    let report = sim.advance(&mut tier, dt, 0);

    assert_eq!(tier.economy.stockpile(Resource::Wood), 0.0);
    assert_eq!(report.shortages.len(), 1);
    assert!((report.shortages[0].unmet_fraction - 0.8).abs() < 1e-12);
    let penalty = tier
        .stability
        .recent_penalties()
        .find(|p| matches!(p, StabilityPenalty::ResourceShortage { resource: Resource::Wood, .. }));
    assert!(penalty.is_some(), "shortage penalty recorded");
    assert_eq!(tier.event_log().events_of("resource_shortage").count(), 1);
}

fn twin(rank: TierRank, stability: f64) -> AbstractTier {
    let mut tier = AbstractTier::new(TierId(1), rank.name(), rank, 2e5, 1e6)
        .unwrap()
        .with_stability(Stability::uniform(stability, StabilityWeights::default()));
    for id in 0..3 {
        tier.universities.push(University { id, name: format!("College {}", id), tier: 4, field: None });
    }
    tier
}

#[test]
fn test_gigasegment_tick_matches_a_year_of_chunk_ticks() {
    let config = EngineConfig::default();
    let sim = StatisticalSimulator::new(&config);
    let table = TimeScaleTable::default();
    let wall = config.controller.wall_tick_minutes;

    let mut giga = twin(TierRank::Gigasegment, 20.0);
    let mut chunk = twin(TierRank::Chunk, 20.0);

    sim.advance(&mut giga, table.delta_years(TierRank::Gigasegment, wall), 0);

    let chunk_dt = table.delta_years(TierRank::Chunk, wall);
    let ticks = (table.multiplier(TierRank::Gigasegment) / table.multiplier(TierRank::Chunk)) as u64;
    assert_eq!(ticks, 525_600);
    for tick in 0..ticks {
        sim.advance(&mut chunk, chunk_dt, tick);
    }

    // Drift of 10 points per year on every sub-score, whatever the tick size
    for (g, c) in [
        (giga.stability.overall(), chunk.stability.overall()),
        (giga.stability.economic(), chunk.stability.economic()),
        (giga.stability.infrastructure(), chunk.stability.infrastructure()),
    ] {
        assert!((g - c).abs() < 1e-6, "stability diverged: {} vs {}", g, c);
    }
    assert!((giga.stability.overall() - 30.0).abs() < 1e-6);
    assert!((giga.research.stable_years - chunk.research.stable_years).abs() < 1e-6);

    // Growth reads stability once per tick, so the coarse tick lags slightly
    let rel = (giga.population.total - chunk.population.total).abs() / giga.population.total;
    assert!(rel < 5e-3, "population diverged: {} vs {}", giga.population.total, chunk.population.total);

    let progress = |t: &AbstractTier| t.tech.level as f64 * 100.0 + t.tech.research;
    assert!((progress(&giga) - progress(&chunk)).abs() < 1e-6);
    assert!((progress(&giga) - 12.0).abs() < 1e-9);
}

#[test]
fn test_population_step_invariant_at_fixed_stability() {
    let config = EngineConfig::default();
    let table = TimeScaleTable::default();
    let wall = config.controller.wall_tick_minutes;

    let mut giga = twin(TierRank::Gigasegment, 70.0);
    let mut chunk = twin(TierRank::Chunk, 70.0);

    update_population(&mut giga, table.delta_years(TierRank::Gigasegment, wall), &config.population);
    let chunk_dt = table.delta_years(TierRank::Chunk, wall);
    for _ in 0..525_600u64 {
        update_population(&mut chunk, chunk_dt, &config.population);
    }

    let rel = (giga.population.total - chunk.population.total).abs() / giga.population.total;
    assert!(rel < 1e-6, "population diverged: {} vs {}", giga.population.total, chunk.population.total);
}

#[test]
fn test_research_year_passes_match_across_scales() {
    let config = EngineConfig::default();
    let table = TimeScaleTable::default();
    let research = ResearchEmergenceSystem::from_config(&config);

    let mut giga = twin(TierRank::Gigasegment, 70.0);
    let mut chunk = twin(TierRank::Chunk, 70.0);
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let giga_years = research.advance(&mut giga, table.delta_years(TierRank::Gigasegment, 1.0), 0, &mut rng);
    assert_eq!(giga_years.len(), 1);

    let chunk_dt = table.delta_years(TierRank::Chunk, 1.0);
    let mut chunk_years = 0;
    for tick in 0..525_600u64 {
        chunk_years += research.advance(&mut chunk, chunk_dt, tick, &mut rng).len();
    }
    assert_eq!(chunk_years, 1);
    assert_eq!(giga.research.years_elapsed, chunk.research.years_elapsed);
}

#[test]
fn test_overshoot_clears_at_every_scale() {
    let config = EngineConfig::default();
    let table = TimeScaleTable::default();
    for rank in TierRank::ALL {
        let mut tier = AbstractTier::new(TierId(1), "Boomtown", rank, 1_000.0, 1_000.0).unwrap();
        tier.population.total = 1_100.0;
        let dt = table.delta_years(rank, 1.0);
        for _ in 0..30 {
            update_population(&mut tier, dt, &config.population);
            assert!(tier.population.total <= 1_100.0 + 1e-9);
        }
        assert!(tier.population.total - 1_000.0 < 1e-3, "{} kept overshoot", rank.name());
    }
}
