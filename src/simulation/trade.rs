//! TradeStabilizer - parent-mediated trade between sibling tiers
//!
//! Runs after every child has finished its own update. A parent compares its
//! children's yearly net rates per resource, pairs the largest surplus with
//! the largest deficit, and keeps a route open until the imbalance has been
//! gone for `close_after_ticks` consecutive ticks.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::TradeConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{Resource, Tick, TierId};
use crate::tier::{AbstractTier, TierArena, TradeRoute};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeReport {
    pub opened: usize,
    pub closed: usize,
    /// Total amount moved this tick
    pub volume: f64,
}

#[derive(Debug, Clone)]
pub struct TradeStabilizer {
    config: TradeConfig,
}

impl TradeStabilizer {
    pub fn new(config: TradeConfig) -> Self {
        Self { config }
    }

    /// Open, run and close routes among the children of `parent`.
    /// `delta_years` gives each child's simulated time for this tick.
    pub fn stabilize<F>(&self, arena: &mut TierArena, parent: TierId, tick: Tick, delta_years: F) -> Result<TradeReport>
    where
        F: Fn(&AbstractTier) -> f64,
    {
        let children: Vec<TierId> = arena.children(parent).to_vec();
        let mut routes = match arena.get_mut(parent) {
            Some(p) => std::mem::take(&mut p.trade_routes),
            None => return Err(EngineError::TierNotFound(parent)),
        };
        // Drop routes whose endpoints moved elsewhere
        routes.retain(|r| children.contains(&r.from) && children.contains(&r.to));

        let mut report = TradeReport::default();
        let nets = self.net_rates(arena, &children);

        self.open_routes(&nets, &mut routes, tick, &mut report);

        for route in &mut routes {
            let from_net = nets.get(&(route.from, route.resource)).copied().unwrap_or(0.0);
            let to_net = nets.get(&(route.to, route.resource)).copied().unwrap_or(0.0);
            let imbalanced = from_net > self.config.imbalance_threshold && to_net < -self.config.imbalance_threshold;

            route.last_transfer = 0.0;
            if !imbalanced {
                route.calm_ticks += 1;
                continue;
            }
            route.calm_ticks = 0;

            let Some((from, to)) = arena.pair_mut(route.from, route.to) else {
                continue;
            };
            let wanted = route.rate * delta_years(from).max(0.0);
            let amount = wanted
                .min(from.economy.stockpile(route.resource))
                .min(self.config.max_transfer_per_tick);
            if amount > 0.0 {
                let moved = from.economy.withdraw(route.resource, amount);
                to.economy.add_stockpile(route.resource, moved);
                route.last_transfer = moved;
                route.total_transferred += moved;
                report.volume += moved;
            }
        }

        let before = routes.len();
        routes.retain(|r| {
            let keep = r.calm_ticks < self.config.close_after_ticks;
            if !keep {
                tracing::debug!(from = %r.from, to = %r.to, resource = ?r.resource, "trade route closed");
            }
            keep
        });
        report.closed = before - routes.len();

        self.update_diplomacy(arena, &children, &routes, &delta_years);

        if let Some(p) = arena.get_mut(parent) {
            p.trade_routes = routes;
        }
        Ok(report)
    }

    fn net_rates(&self, arena: &TierArena, children: &[TierId]) -> BTreeMap<(TierId, Resource), f64> {
        let mut nets = BTreeMap::new();
        for id in children {
            if let Some(child) = arena.get(*id) {
                for resource in child.economy.resources() {
                    nets.insert((*id, resource), child.economy.net_rate(resource));
                }
            }
        }
        nets
    }

    /// Pair surpluses with deficits, largest first, per resource
    fn open_routes(
        &self,
        nets: &BTreeMap<(TierId, Resource), f64>,
        routes: &mut Vec<TradeRoute>,
        tick: Tick,
        report: &mut TradeReport,
    ) {
        let threshold = self.config.imbalance_threshold;
        let resources: BTreeSet<Resource> = nets.keys().map(|(_, r)| *r).collect();
        let mut next_id = routes.iter().map(|r| r.id + 1).max().unwrap_or(1);

        for resource in resources {
            let mut surplus: Vec<(TierId, f64)> = nets
                .iter()
                .filter(|((_, r), net)| *r == resource && **net > threshold)
                .map(|((id, _), net)| (*id, *net))
                .collect();
            let mut deficit: Vec<(TierId, f64)> = nets
                .iter()
                .filter(|((_, r), net)| *r == resource && **net < -threshold)
                .map(|((id, _), net)| (*id, -*net))
                .collect();
            surplus.sort_by(|a, b| b.1.total_cmp(&a.1));
            deficit.sort_by(|a, b| b.1.total_cmp(&a.1));

            for ((from, supply), (to, demand)) in surplus.into_iter().zip(deficit) {
                if routes.iter().any(|r| r.resource == resource && r.connects(from, to)) {
                    continue;
                }
                let rate = supply.min(demand).min(self.config.max_route_rate);
                tracing::debug!(%from, %to, ?resource, rate, "trade route opened");
                routes.push(TradeRoute {
                    id: next_id,
                    from,
                    to,
                    resource,
                    rate,
                    opened_at: tick,
                    calm_ticks: 0,
                    last_transfer: 0.0,
                    total_transferred: 0.0,
                });
                next_id += 1;
                report.opened += 1;
            }
        }
    }

    /// Sibling segments warm to trading partners and drift back to neutral otherwise
    fn update_diplomacy<F>(&self, arena: &mut TierArena, children: &[TierId], routes: &[TradeRoute], delta_years: &F)
    where
        F: Fn(&AbstractTier) -> f64,
    {
        for id in children {
            let Some(tier) = arena.get_mut(*id) else {
                continue;
            };
            let dt = delta_years(tier).max(0.0);
            let Some(extension) = tier.extension.as_mut() else {
                continue;
            };
            for other in children.iter().filter(|o| *o != id) {
                let partners = routes.iter().filter(|r| r.connects(*id, *other)).count() as f64;
                let opinion = extension.diplomacy.entry(*other).or_insert(0.0);
                let decayed = *opinion * (-self.config.opinion_decay_rate * dt).exp();
                *opinion = (decayed + partners * self.config.opinion_gain_per_route * dt).clamp(-100.0, 100.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TierRank;

    fn zone(id: u32, food: (f64, f64), stock: f64) -> AbstractTier {
        AbstractTier::new(TierId(id), format!("Z{}", id), TierRank::Zone, 100.0, 1_000.0)
            .unwrap()
            .with_stockpile(Resource::Food, stock)
            .with_rates(Resource::Food, food.0, food.1)
            .unwrap()
    }

    fn world() -> TierArena {
        let root = AbstractTier::new(TierId(1), "Region", TierRank::Region, 0.0, 1.0).unwrap();
        let mut arena = TierArena::new(root).unwrap();
        arena.add_child(TierId(1), zone(2, (100.0, 20.0), 1_000.0)).unwrap();
        arena.add_child(TierId(1), zone(3, (10.0, 60.0), 0.0)).unwrap();
        arena
    }

    #[test]
    fn test_route_opens_and_transfers() {
        let mut arena = world();
        let trade = TradeStabilizer::new(TradeConfig::default());
        let report = trade.stabilize(&mut arena, TierId(1), 0, |_| 1.0).unwrap();

        assert_eq!(report.opened, 1);
        let route = &arena.get(TierId(1)).unwrap().trade_routes[0];
        assert_eq!(route.from, TierId(2));
        assert_eq!(route.to, TierId(3));
        // min(surplus 80, deficit 50)
        assert_eq!(route.rate, 50.0);
        assert_eq!(arena.get(TierId(3)).unwrap().economy.stockpile(Resource::Food), 50.0);
        assert_eq!(arena.get(TierId(2)).unwrap().economy.stockpile(Resource::Food), 950.0);
    }

    #[test]
    fn test_transfer_bounded_by_stock_and_tick_cap() {
        let mut arena = world();
        arena.get_mut(TierId(2)).unwrap().economy.set_stockpile(Resource::Food, 5.0);
        let trade = TradeStabilizer::new(TradeConfig::default());
        let report = trade.stabilize(&mut arena, TierId(1), 0, |_| 100.0).unwrap();
        assert_eq!(report.volume, 5.0);
        assert_eq!(arena.get(TierId(2)).unwrap().economy.stockpile(Resource::Food), 0.0);
    }

    #[test]
    fn test_route_closes_after_sustained_calm() {
        let mut arena = world();
        let config = TradeConfig::default();
        let close_after = config.close_after_ticks;
        let trade = TradeStabilizer::new(config);
        trade.stabilize(&mut arena, TierId(1), 0, |_| 0.01).unwrap();

        // Deficit disappears
        arena.get_mut(TierId(3)).unwrap().economy.set_consumption(Resource::Food, 10.0).unwrap();
        for tick in 1..close_after as u64 {
            trade.stabilize(&mut arena, TierId(1), tick, |_| 0.01).unwrap();
            assert_eq!(arena.get(TierId(1)).unwrap().trade_routes.len(), 1, "closed too early at {}", tick);
        }
        let report = trade.stabilize(&mut arena, TierId(1), close_after as u64, |_| 0.01).unwrap();
        assert_eq!(report.closed, 1);
        assert!(arena.get(TierId(1)).unwrap().trade_routes.is_empty());
    }

    #[test]
    fn test_short_dip_does_not_close_route() {
        let mut arena = world();
        let trade = TradeStabilizer::new(TradeConfig::default());
        trade.stabilize(&mut arena, TierId(1), 0, |_| 0.01).unwrap();
        arena.get_mut(TierId(3)).unwrap().economy.set_consumption(Resource::Food, 10.0).unwrap();
        trade.stabilize(&mut arena, TierId(1), 1, |_| 0.01).unwrap();
        arena.get_mut(TierId(3)).unwrap().economy.set_consumption(Resource::Food, 60.0).unwrap();
        trade.stabilize(&mut arena, TierId(1), 2, |_| 0.01).unwrap();

        let routes = &arena.get(TierId(1)).unwrap().trade_routes;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].calm_ticks, 0);
        assert_eq!(routes[0].opened_at, 0);
    }

    #[test]
    fn test_segments_warm_to_trade_partners() {
        let root = AbstractTier::new(TierId(1), "Giga", TierRank::Gigasegment, 0.0, 1.0).unwrap();
        let mut arena = TierArena::new(root).unwrap();
        for (id, rates) in [(2, (500.0, 100.0)), (3, (0.0, 300.0))] {
            let mega = AbstractTier::new(TierId(id), "Mega", TierRank::Megasegment, 1e6, 1e7)
                .unwrap()
                .with_stockpile(Resource::Metal, 1e4)
                .with_rates(Resource::Metal, rates.0, rates.1)
                .unwrap();
            arena.add_child(TierId(1), mega).unwrap();
        }
        let trade = TradeStabilizer::new(TradeConfig::default());
        for tick in 0..5 {
            trade.stabilize(&mut arena, TierId(1), tick, |_| 1.0).unwrap();
        }
        let opinion = arena.get(TierId(2)).unwrap().extension.as_ref().unwrap().opinion_of(TierId(3));
        assert!(opinion > 0.0);
    }
}
