//! Read-only aggregate views of a subtree for the presentation layer

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Resource, TierId, TierMode, TierRank};
use crate::tier::TierArena;

/// Aggregated state of a tier and everything below it.
///
/// Leaves report their own state. Inner tiers sum their children, so
/// rolled-up values held on the inner tier itself are not counted twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub id: TierId,
    pub name: String,
    pub rank: TierRank,
    pub mode: TierMode,
    pub population: f64,
    pub carrying_capacity: f64,
    pub believers: BTreeMap<String, f64>,
    pub temples: BTreeMap<String, u32>,
    pub stockpiles: BTreeMap<Resource, f64>,
    pub production: BTreeMap<Resource, f64>,
    pub consumption: BTreeMap<Resource, f64>,
    /// Population-weighted mean of `overall` stability
    pub stability: f64,
    pub max_tech_level: u8,
    pub trade_routes: usize,
    pub scientists: usize,
    pub papers_published: usize,
    pub children: Vec<TierSummary>,
}

fn merge<K: Ord + Clone, V: Copy + std::ops::AddAssign + Default>(into: &mut BTreeMap<K, V>, from: &BTreeMap<K, V>) {
    for (key, value) in from {
        *into.entry(key.clone()).or_default() += *value;
    }
}

impl TierSummary {
    pub fn collect(arena: &TierArena, id: TierId) -> Option<Self> {
        let tier = arena.get(id)?;
        let children: Vec<TierSummary> = tier.children.iter().filter_map(|c| Self::collect(arena, *c)).collect();

        let mut summary = Self {
            id,
            name: tier.name.clone(),
            rank: tier.rank,
            mode: tier.mode(),
            population: tier.population.total,
            carrying_capacity: tier.population.carrying_capacity,
            believers: tier.belief.believer_counts().clone(),
            temples: tier.belief.temple_counts().clone(),
            stockpiles: tier.economy.stockpiles().clone(),
            production: tier.economy.production_rates().clone(),
            consumption: tier.economy.consumption_rates().clone(),
            stability: tier.stability.overall(),
            max_tech_level: tier.tech.level,
            trade_routes: tier.trade_routes.len(),
            scientists: tier.research.scientists.len(),
            papers_published: tier.research.published_count(),
            children: Vec::new(),
        };
        if children.is_empty() {
            return Some(summary);
        }

        summary.population = children.iter().map(|c| c.population).sum();
        summary.carrying_capacity = children.iter().map(|c| c.carrying_capacity).sum();
        summary.believers.clear();
        summary.temples.clear();
        summary.stockpiles.clear();
        summary.production.clear();
        summary.consumption.clear();

        let mut weighted = 0.0;
        for child in &children {
            merge(&mut summary.believers, &child.believers);
            merge(&mut summary.temples, &child.temples);
            merge(&mut summary.stockpiles, &child.stockpiles);
            merge(&mut summary.production, &child.production);
            merge(&mut summary.consumption, &child.consumption);
            weighted += child.stability * child.population;
            summary.max_tech_level = summary.max_tech_level.max(child.max_tech_level);
            summary.trade_routes += child.trade_routes;
            summary.scientists += child.scientists;
            summary.papers_published += child.papers_published;
        }
        summary.stability = if summary.population > 0.0 {
            weighted / summary.population
        } else {
            children.iter().map(|c| c.stability).sum::<f64>() / children.len() as f64
        };
        summary.children = children;
        Some(summary)
    }

    pub fn total_believers(&self) -> f64 {
        self.believers.values().sum()
    }

    /// Number of tiers in the summarized subtree
    pub fn tier_count(&self) -> usize {
        1 + self.children.iter().map(TierSummary::tier_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::AbstractTier;

    #[test]
    fn test_summary_sums_children() {
        let root = AbstractTier::new(TierId(1), "Region", TierRank::Region, 0.0, 1.0).unwrap();
        let mut arena = TierArena::new(root).unwrap();
        let a = AbstractTier::new(TierId(2), "A", TierRank::Zone, 1_000.0, 2_000.0)
            .unwrap()
            .with_stockpile(Resource::Food, 10.0)
            .with_believers("sun", 400.0, 2)
            .with_tech_level(2);
        let b = AbstractTier::new(TierId(3), "B", TierRank::Zone, 3_000.0, 4_000.0)
            .unwrap()
            .with_stockpile(Resource::Food, 5.0)
            .with_believers("sun", 100.0, 1)
            .with_tech_level(5);
        arena.add_child(TierId(1), a).unwrap();
        arena.add_child(TierId(1), b).unwrap();

        let summary = TierSummary::collect(&arena, TierId(1)).unwrap();
        assert_eq!(summary.population, 4_000.0);
        assert_eq!(summary.carrying_capacity, 6_000.0);
        assert_eq!(summary.believers.get("sun"), Some(&500.0));
        assert_eq!(summary.temples.get("sun"), Some(&3));
        assert_eq!(summary.stockpiles.get(&Resource::Food), Some(&15.0));
        assert_eq!(summary.max_tech_level, 5);
        assert_eq!(summary.tier_count(), 3);
    }

    #[test]
    fn test_unknown_tier_has_no_summary() {
        let root = AbstractTier::new(TierId(1), "Region", TierRank::Region, 10.0, 100.0).unwrap();
        let arena = TierArena::new(root).unwrap();
        assert!(TierSummary::collect(&arena, TierId(9)).is_none());
    }
}
