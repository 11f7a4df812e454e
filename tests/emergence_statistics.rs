//! Statistical checks of the rare-specialist emergence model
//!
//! A populous, stable tier is rolled for 300 simulated years over thousands
//! of seeds; the number of tier-80 specialists that emerge must match the
//! sum of the yearly probabilities within a binomial confidence band. A
//! seeded run through the full simulator checks that the sustained-stability
//! counter feeding that model builds up, or resets, from the tier's own state.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata::core::config::EngineConfig;
use strata::core::TimeScaleTable;
use strata::core::types::{PaperId, Resource, ResearchField, TierId, TierRank};
use strata::research::{EmergenceState, PaperKey, ResearchEmergenceSystem, ResearchPaper};
use strata::simulation::StatisticalSimulator;
use strata::tier::{AbstractTier, ResearchGuild, Stability, StabilityWeights, University};

const RARITY: u8 = 80;
const YEARS: u32 = 300;
const RUNS: u64 = 5_000;

fn research_world() -> AbstractTier {
    let mut tier = AbstractTier::new(TierId(1), "Lyceum Reach", TierRank::Megasegment, 1e9, 2e9).unwrap();
    for id in 0..8 {
        tier.universities.push(University { id, name: format!("University {}", id), tier: 10, field: None });
    }
    for id in 0..45 {
        tier.research_guilds.push(ResearchGuild {
            id,
            name: format!("Guild {}", id),
            tier: 10,
            influence: 1.0,
            field: None,
        });
    }
    tier.research.papers.push(ResearchPaper {
        id: PaperId(0),
        field: ResearchField::Physics,
        tier: 70,
        prerequisites: Vec::new(),
        required_guilds: 0,
        required_specialists: BTreeMap::new(),
        estimated_years: 40.0,
        progress: 10.0,
        collaborating_institutions: Vec::new(),
        stalled_years: 0,
    });
    for step in 1..=20u8 {
        let field = ResearchField::ALL[step as usize % ResearchField::ALL.len()];
        tier.research.published.push(PaperKey { field, tier: step });
    }
    tier
}

#[test]
fn test_emergence_count_matches_formula() {
    let system = ResearchEmergenceSystem::from_config(&EngineConfig::default());
    let template = research_world();

    // Yearly probabilities for the scenario: stability accumulates one year per year
    let mut scenario = template.clone();
    let probabilities: Vec<f64> = (1..=YEARS)
        .map(|year| {
            scenario.research.stable_years = year as f64;
            system.yearly_probability(&scenario, ResearchField::Physics, RARITY)
        })
        .collect();
    let per_run: f64 = probabilities.iter().sum();
    let variance_per_run: f64 = probabilities.iter().map(|p| p * (1.0 - p)).sum();
    assert!(per_run > 0.0, "scenario must allow emergence");
    // Not before half the stability requirement
    assert_eq!(probabilities[78], 0.0);

    let mut observed = 0u64;
    for seed in 0..RUNS {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut tier = template.clone();
        for year in 1..=YEARS {
            tier.research.stable_years = year as f64;
            tier.research.years_elapsed = year as u64;
            if system
                .attempt_emergence(&mut tier, ResearchField::Physics, RARITY, year as u64, &mut rng)
                .is_some()
            {
                observed += 1;
            }
        }
    }

    let expected = per_run * RUNS as f64;
    let sigma = (variance_per_run * RUNS as f64).sqrt();
    let deviation = (observed as f64 - expected).abs();
    assert!(
        deviation <= 4.0 * sigma + 1.0,
        "observed {} emergences, expected {:.1} ± {:.1}",
        observed,
        expected,
        sigma
    );
}

#[test]
fn test_state_machine_follows_preconditions() {
    let system = ResearchEmergenceSystem::from_config(&EngineConfig::default());
    let mut tier = research_world();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    // Stability requirement unmet: stays dormant, no roll
    tier.research.stable_years = 10.0;
    assert!(system.attempt_emergence(&mut tier, ResearchField::Physics, RARITY, 0, &mut rng).is_none());
    assert_eq!(tier.research.emergence_state(ResearchField::Physics, RARITY), EmergenceState::Dormant);

    // Requirement met: becomes a candidate (emergence itself is very unlikely in one roll)
    tier.research.stable_years = 200.0;
    let emerged = system.attempt_emergence(&mut tier, ResearchField::Physics, RARITY, 1, &mut rng);
    let state = tier.research.emergence_state(ResearchField::Physics, RARITY);
    match emerged {
        Some(_) => assert!(matches!(state, EmergenceState::Emerged { count: 1, .. })),
        None => assert!(matches!(state, EmergenceState::Candidate { .. })),
    }

    // Losing stability again sends a candidate back to dormant
    if emerged.is_none() {
        tier.research.stable_years = 0.0;
        system.attempt_emergence(&mut tier, ResearchField::Physics, RARITY, 2, &mut rng);
        assert_eq!(tier.research.emergence_state(ResearchField::Physics, RARITY), EmergenceState::Dormant);
    }
}

#[test]
fn test_rarer_specialists_are_less_likely() {
    let system = ResearchEmergenceSystem::from_config(&EngineConfig::default());
    let mut tier = research_world();
    tier.research.stable_years = 1_000.0;
    let p60 = system.yearly_probability(&tier, ResearchField::Physics, 60);
    let p80 = system.yearly_probability(&tier, ResearchField::Physics, 80);
    let p100 = system.yearly_probability(&tier, ResearchField::Physics, 100);
    assert!(p60 > p80);
    assert!(p80 > p100);
    assert!(p100 < 1e-5);
}

/// Drive the statistical simulator and the research system together, one
/// megasegment tick at a time, for `years` simulated years
fn simulate(mut tier: AbstractTier, years: f64, seed: u64) -> (AbstractTier, Vec<(u64, f64)>) {
    let config = EngineConfig::default();
    let sim = StatisticalSimulator::new(&config);
    let system = ResearchEmergenceSystem::from_config(&config);
    let dt = TimeScaleTable::default().delta_years(TierRank::Megasegment, config.controller.wall_tick_minutes);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut trace = Vec::new();

    let ticks = (years / dt).round() as u64;
    for tick in 0..ticks {
        sim.advance(&mut tier, dt, tick);
        for _ in system.advance(&mut tier, dt, tick, &mut rng) {
            trace.push((tier.research.years_elapsed, tier.research.stable_years));
        }
    }
    (tier, trace)
}

#[test]
fn test_stable_economy_accrues_stability_years_end_to_end() {
    let system = ResearchEmergenceSystem::from_config(&EngineConfig::default());
    let tier = research_world()
        .with_stability(Stability::uniform(80.0, StabilityWeights::default()))
        .with_stockpile(Resource::Food, 1e9)
        .with_rates(Resource::Food, 2e9, 1e9)
        .unwrap();
    assert_eq!(system.yearly_probability(&tier, ResearchField::Physics, RARITY), 0.0);

    let (tier, trace) = simulate(tier, YEARS as f64, 7);

    assert!(tier.research.years_elapsed >= YEARS as u64 - 1);
    // Never reset: the counter tracks simulated time
    for (year, stable) in &trace {
        assert!((stable - *year as f64).abs() < 0.5, "year {} had {} stable years", year, stable);
    }
    assert!(tier.stability.overall() >= 60.0);
    assert!(tier.economy.stockpile(Resource::Food) > 1e9);

    // Long stability opened the tier-80 track
    assert!(system.yearly_probability(&tier, ResearchField::Physics, RARITY) > 0.0);
    assert_ne!(tier.research.emergence_state(ResearchField::Physics, RARITY), EmergenceState::Dormant);
}

#[test]
fn test_famine_keeps_the_counter_at_zero() {
    let system = ResearchEmergenceSystem::from_config(&EngineConfig::default());
    let tier = research_world()
        .with_stability(Stability::uniform(80.0, StabilityWeights::default()))
        .with_rates(Resource::Food, 0.0, 1e9)
        .unwrap();

    let (tier, trace) = simulate(tier, 100.0, 7);

    assert!(tier.stability.overall() < 60.0);
    assert_eq!(tier.research.stable_years, 0.0);
    assert!(trace.iter().rev().take(50).all(|(_, stable)| *stable == 0.0));
    assert_eq!(system.yearly_probability(&tier, ResearchField::Physics, RARITY), 0.0);
}
