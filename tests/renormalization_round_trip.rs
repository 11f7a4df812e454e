//! Zoom-in followed by zoom-out through the controller.
//!
//! With a compliant entity engine the aggregates come back within 5% and the
//! preserved set keeps the same identity.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata::controller::{ActiveFeed, EntityEngine, NullEntityEngine, SimulationController};
use strata::core::config::{EngineConfig, ResearchConfig};
use strata::core::types::{EntityId, Resource, ResearchField, TierId, TierMode, TierRank};
use strata::renormalization::{within_tolerance, EntitySnapshot, ZoomInConstraints};
use strata::research::Scientist;
use strata::tier::{
    AbstractTier, Building, BuildingKind, EventKind, NamedEntity, Stability, StabilityWeights, TierArena,
};

const WARD: TierId = TierId(3);

fn ward() -> AbstractTier {
    let mut tier = AbstractTier::new(WARD, "Lamplighters' Ward", TierRank::Chunk, 4_200.0, 9_000.0)
        .unwrap()
        .with_stability(Stability::new(72.0, 64.0, 58.0, 81.0, StabilityWeights::default()))
        .with_tech_level(4)
        .with_stockpile(Resource::Food, 1_500.0)
        .with_stockpile(Resource::Metal, 320.0)
        .with_rates(Resource::Food, 900.0, 850.0)
        .unwrap()
        .with_rates(Resource::Metal, 40.0, 35.0)
        .unwrap()
        .with_believers("the Lantern", 2_500.0, 3)
        .with_believers("the Deep", 900.0, 1);

    tier.preserved.upsert_entity(NamedEntity {
        id: EntityId::from_random_bytes([21; 16]),
        name: "Marshal Oduya".into(),
        role: "general".into(),
        fame: 88.0,
        rarity_tier: None,
        field: None,
    });
    tier.preserved.upsert_building(Building {
        id: EntityId::from_random_bytes([22; 16]),
        name: "Temple of the Lantern".into(),
        kind: BuildingKind::Temple,
        deity: Some("the Lantern".into()),
        tier: 2,
    });
    for tick in 0..5 {
        tier.log_event(tick, EventKind::Recorded, format!("Founding rite {}", tick), 0.3);
    }

    let config = ResearchConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut famous = Scientist::generate(&mut rng, ResearchField::Physics, 85, None, &config);
    famous.fame = 90.0;
    tier.preserved.upsert_entity(famous.to_named_entity());
    let mut obscure = Scientist::generate(&mut rng, ResearchField::Biology, 60, None, &config);
    obscure.fame = 5.0;
    tier.research.scientists.push(famous);
    tier.research.scientists.push(obscure);
    tier
}

fn controller() -> SimulationController {
    let config = EngineConfig::default();
    let root = AbstractTier::new(TierId(1), "Spindle", TierRank::Zone, 0.0, 1.0).unwrap();
    let mut arena = TierArena::new(root).unwrap();
    let quay = AbstractTier::new(TierId(2), "Quay", TierRank::Chunk, 3_000.0, 8_000.0).unwrap();
    arena.add_child(TierId(1), quay).unwrap();
    arena.add_child(TierId(1), ward()).unwrap();
    SimulationController::new(arena, config, Box::new(NullEntityEngine::new()), 5).unwrap()
}

#[test]
fn test_round_trip_restores_aggregates() {
    let mut c = controller();
    let before = c.get_tier_by_id(WARD).unwrap().clone();

    let constraints = c.zoom_in(WARD).unwrap();
    assert_eq!(constraints.target_population, 4_200.0);
    assert_eq!(constraints.specialists.len(), 2);
    assert_eq!(c.get_tier_by_id(WARD).unwrap().mode(), TierMode::Active);
    assert_eq!(c.get_tier_by_id(TierId(1)).unwrap().mode(), TierMode::SemiActive);

    c.zoom_out(WARD).unwrap();
    let after = c.get_tier_by_id(WARD).unwrap();

    assert_eq!(after.mode(), TierMode::Abstract);
    assert_eq!(c.get_tier_by_id(TierId(1)).unwrap().mode(), TierMode::Abstract);
    assert!(within_tolerance(before.population.total, after.population.total));
    assert!(within_tolerance(before.stability.overall(), after.stability.overall()));
    assert!(within_tolerance(before.stability.social(), after.stability.social()));
    assert_eq!(before.tech.level, after.tech.level);
    for resource in [Resource::Food, Resource::Metal] {
        assert!(within_tolerance(before.economy.stockpile(resource), after.economy.stockpile(resource)));
        assert!(within_tolerance(before.economy.production(resource), after.economy.production(resource)));
        assert!(within_tolerance(before.economy.consumption(resource), after.economy.consumption(resource)));
    }
    for deity in ["the Lantern", "the Deep"] {
        assert!(within_tolerance(before.belief.believers(deity), after.belief.believers(deity)));
    }
}

#[test]
fn test_round_trip_keeps_preserved_identity() {
    let mut c = controller();
    let before = c.get_tier_by_id(WARD).unwrap().preserved.identity();

    c.zoom_in(WARD).unwrap();
    c.zoom_out(WARD).unwrap();
    let after = c.get_tier_by_id(WARD).unwrap();

    assert_eq!(after.preserved.identity(), before);
    assert_eq!(after.event_log().len(), 5);
    // The famous scientist stays tracked, the obscure one joins the pool
    assert_eq!(after.research.scientists.len(), 1);
    assert_eq!(after.research.scientists[0].field, ResearchField::Physics);
    assert_eq!(after.scientist_pool.count(60), 1);
}

#[test]
fn test_active_ticks_then_round_trip() {
    let mut c = controller();
    c.zoom_in(WARD).unwrap();
    c.run(10);
    // The compliant engine keeps feeding the instantiated population
    assert_eq!(c.get_tier_by_id(WARD).unwrap().population.total, 4_200.0);

    c.zoom_out(WARD).unwrap();
    let tier = c.get_tier_by_id(WARD).unwrap();
    assert!(within_tolerance(4_200.0, tier.population.total));
    assert!(tier.belief.total_believers() <= tier.population.total);
}

#[test]
fn test_repeated_round_trips_do_not_drift() {
    let mut c = controller();
    let before = c.get_tier_by_id(WARD).unwrap().clone();
    for _ in 0..5 {
        c.zoom_in(WARD).unwrap();
        c.zoom_out(WARD).unwrap();
    }
    let after = c.get_tier_by_id(WARD).unwrap();
    assert!(within_tolerance(before.population.total, after.population.total));
    assert!(within_tolerance(before.stability.overall(), after.stability.overall()));
    assert_eq!(after.preserved.identity(), before.preserved.identity());
    assert_eq!(after.scientist_pool.count(60), 1);
}

/// Entity engine whose inhabitants doubled while the tier was active
struct BoomEngine {
    inner: NullEntityEngine,
}

impl EntityEngine for BoomEngine {
    fn instantiate(&mut self, constraints: &ZoomInConstraints) -> Result<(), String> {
        self.inner.instantiate(constraints)
    }

    fn snapshot(&mut self, tier: TierId) -> Result<EntitySnapshot, String> {
        self.inner.snapshot(tier).map(|mut snapshot| {
            snapshot.population *= 2.0;
            for amount in snapshot.stockpiles.values_mut() {
                *amount *= 2.0;
            }
            snapshot
        })
    }

    fn feed(&self, tier: TierId) -> Option<ActiveFeed> {
        self.inner.feed(tier)
    }

    fn release(&mut self, tier: TierId) {
        self.inner.release(tier)
    }
}

const DISTRICT: TierId = TierId(11);

fn district_controller() -> SimulationController {
    let mut config = EngineConfig::default();
    config.events.annual_event_rate = 0.0;

    let root = AbstractTier::new(TierId(10), "Spindle", TierRank::Subsection, 4_000.0, 40_000.0).unwrap();
    let mut arena = TierArena::new(root).unwrap();
    let district = AbstractTier::new(DISTRICT, "Lantern District", TierRank::Region, 4_000.0, 40_000.0)
        .unwrap()
        .with_stockpile(Resource::Food, 800.0)
        .with_rates(Resource::Food, 600.0, 600.0)
        .unwrap();
    arena.add_child(TierId(10), district).unwrap();
    let mill = AbstractTier::new(TierId(12), "Mill Row", TierRank::Chunk, 3_000.0, 20_000.0)
        .unwrap()
        .with_stockpile(Resource::Food, 600.0)
        .with_rates(Resource::Food, 500.0, 400.0)
        .unwrap()
        .with_believers("the Lantern", 1_500.0, 1);
    let well = AbstractTier::new(TierId(13), "Well Steps", TierRank::Chunk, 1_000.0, 20_000.0)
        .unwrap()
        .with_stockpile(Resource::Food, 200.0)
        .with_rates(Resource::Food, 100.0, 200.0)
        .unwrap();
    arena.add_child(DISTRICT, mill).unwrap();
    arena.add_child(DISTRICT, well).unwrap();

    let engine = BoomEngine { inner: NullEntityEngine::new() };
    SimulationController::new(arena, config, Box::new(engine), 23).unwrap()
}

#[test]
fn test_inner_tier_zoom_out_survives_rollup() {
    let mut c = district_controller();
    c.zoom_in(DISTRICT).unwrap();
    c.zoom_out(DISTRICT).unwrap();

    assert!((c.get_tier_by_id(DISTRICT).unwrap().population.total - 8_000.0).abs() < 1e-9);
    // Leaves carry the snapshot in their old proportions
    let mill = c.get_tier_by_id(TierId(12)).unwrap();
    let well = c.get_tier_by_id(TierId(13)).unwrap();
    assert!((mill.population.total - 6_000.0).abs() < 1e-9);
    assert!((well.population.total - 2_000.0).abs() < 1e-9);
    assert!((mill.belief.believers("the Lantern") - 3_000.0).abs() < 1e-9);
    assert!((mill.economy.stockpile(Resource::Food) - 1_200.0).abs() < 1e-9);
    assert!((well.economy.stockpile(Resource::Food) - 400.0).abs() < 1e-9);
    assert!((mill.economy.production(Resource::Food) + well.economy.production(Resource::Food) - 600.0).abs() < 1e-9);

    for _ in 0..10 {
        c.tick();
        let district = c.get_tier_by_id(DISTRICT).unwrap().population.total;
        assert!((district - 8_000.0).abs() / 8_000.0 < 1e-3, "district fell back to {}", district);
    }
    let root = c.get_tier_by_id(TierId(10)).unwrap().population.total;
    assert!((root - 8_000.0).abs() / 8_000.0 < 1e-3);
}
