//! TierArena - owns every tier, keyed by stable id
//!
//! The hierarchy is a strict tree. Parent/child links and trade routes are
//! stored as ids, never as references, so there are no ownership cycles.

use ahash::AHashMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::{TierId, TierMode};
use crate::tier::AbstractTier;

#[derive(Debug, Clone)]
pub struct TierArena {
    tiers: Vec<AbstractTier>,
    index: AHashMap<TierId, usize>,
    root: TierId,
}

impl TierArena {
    /// Create an arena rooted at `root`
    pub fn new(mut root: AbstractTier) -> Result<Self> {
        root.validate()?;
        root.parent = None;
        root.children.clear();
        let root_id = root.id;

        let mut index = AHashMap::new();
        index.insert(root_id, 0);

        Ok(Self {
            tiers: vec![root],
            index,
            root: root_id,
        })
    }

    /// Attach a new tier under `parent`
    pub fn add_child(&mut self, parent: TierId, mut tier: AbstractTier) -> Result<TierId> {
        tier.validate()?;
        if self.index.contains_key(&tier.id) {
            return Err(EngineError::DuplicateTier(tier.id));
        }
        let parent_rank = self.get(parent).ok_or(EngineError::TierNotFound(parent))?.rank;
        if !parent_rank.outranks(&tier.rank) {
            return Err(EngineError::RankOrder { tier: tier.id, parent: parent_rank, child: tier.rank });
        }

        let id = tier.id;
        tier.parent = Some(parent);
        tier.children.clear();

        self.index.insert(id, self.tiers.len());
        self.tiers.push(tier);
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Move a subtree under a new parent, rejecting moves that would form a cycle
    pub fn reparent(&mut self, id: TierId, new_parent: TierId) -> Result<()> {
        if id == self.root {
            return Err(EngineError::CyclicHierarchy(id));
        }
        let rank = self.get(id).ok_or(EngineError::TierNotFound(id))?.rank;
        let parent_rank = self.get(new_parent).ok_or(EngineError::TierNotFound(new_parent))?.rank;
        if new_parent == id || self.ancestors(new_parent).contains(&id) {
            return Err(EngineError::CyclicHierarchy(id));
        }
        if !parent_rank.outranks(&rank) {
            return Err(EngineError::RankOrder { tier: id, parent: parent_rank, child: rank });
        }

        if let Some(old_parent) = self.get(id).and_then(|t| t.parent) {
            if let Some(p) = self.get_mut(old_parent) {
                p.children.retain(|c| *c != id);
                p.trade_routes.retain(|r| r.from != id && r.to != id);
            }
        }
        if let Some(p) = self.get_mut(new_parent) {
            p.children.push(id);
        }
        if let Some(t) = self.get_mut(id) {
            t.parent = Some(new_parent);
        }
        Ok(())
    }

    pub fn root_id(&self) -> TierId {
        self.root
    }

    pub fn root(&self) -> &AbstractTier {
        &self.tiers[0]
    }

    pub fn get(&self, id: TierId) -> Option<&AbstractTier> {
        self.index.get(&id).map(|&i| &self.tiers[i])
    }

    pub fn get_mut(&mut self, id: TierId) -> Option<&mut AbstractTier> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.tiers[i]),
            None => None,
        }
    }

    pub fn index_of(&self, id: TierId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: TierId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tiers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AbstractTier> {
        self.tiers.iter()
    }

    /// Tiers in insertion order, as a slice for batch updates
    pub fn tiers_mut(&mut self) -> &mut [AbstractTier] {
        &mut self.tiers
    }

    /// Mutable access to two distinct tiers at once
    pub fn pair_mut(&mut self, a: TierId, b: TierId) -> Option<(&mut AbstractTier, &mut AbstractTier)> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.tiers.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.tiers.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    pub fn children(&self, id: TierId) -> &[TierId] {
        self.get(id).map(|t| t.children.as_slice()).unwrap_or(&[])
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self, id: TierId) -> Vec<TierId> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(|t| t.parent);
        while let Some(pid) = current {
            if result.contains(&pid) {
                break;
            }
            result.push(pid);
            current = self.get(pid).and_then(|t| t.parent);
        }
        result
    }

    /// Every tier below `id`, depth first
    pub fn descendants(&self, id: TierId) -> Vec<TierId> {
        let mut result = Vec::new();
        let mut stack: Vec<TierId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Leaf tiers below `id`, depth first; empty when `id` is itself a leaf
    pub fn leaves_under(&self, id: TierId) -> Vec<TierId> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.get(*d).map(|t| t.is_leaf()).unwrap_or(false))
            .collect()
    }

    /// Pre-order traversal with depth, for hierarchy display
    pub fn depth_first(&self) -> Vec<(usize, TierId)> {
        let mut result = Vec::with_capacity(self.tiers.len());
        let mut stack = vec![(0usize, self.root)];
        while let Some((depth, id)) = stack.pop() {
            result.push((depth, id));
            for child in self.children(id).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        result
    }

    /// Children before parents
    pub fn post_order(&self) -> Vec<TierId> {
        let mut order = self.depth_first();
        order.reverse();
        // Reversed pre-order visits every child before its parent
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Population of a tier: recursive sum over leaves, or its own total for a leaf
    pub fn total_population(&self, id: TierId) -> f64 {
        match self.get(id) {
            Some(tier) if tier.is_leaf() => tier.population.total,
            Some(tier) => tier.children.iter().map(|c| self.total_population(*c)).sum(),
            None => 0.0,
        }
    }

    /// True if `id` sits somewhere below an active tier
    pub fn is_under_active(&self, id: TierId) -> bool {
        self.ancestors(id)
            .iter()
            .any(|a| self.get(*a).map(|t| t.mode() == TierMode::Active).unwrap_or(false))
    }

    /// Mode invariant: the parent of an active or semi-active tier is semi-active
    pub fn validate_modes(&self) -> Result<()> {
        for tier in &self.tiers {
            if !tier.mode().is_delegated() {
                continue;
            }
            if let Some(parent) = tier.parent.and_then(|p| self.get(p)) {
                if parent.mode() != TierMode::SemiActive {
                    return Err(EngineError::ModeInvariant { tier: tier.id, mode: tier.mode() });
                }
            }
        }
        Ok(())
    }

    /// Replace a tier's state in place, keeping its position in the tree
    pub(crate) fn replace(&mut self, mut tier: AbstractTier) -> Result<()> {
        let index = self.index_of(tier.id).ok_or(EngineError::TierNotFound(tier.id))?;
        let old = &self.tiers[index];
        tier.parent = old.parent;
        tier.children = old.children.clone();
        tier.trade_routes = old.trade_routes.clone();
        self.tiers[index] = tier;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TierRank;

    fn tier(id: u32, rank: TierRank, pop: f64) -> AbstractTier {
        AbstractTier::new(TierId(id), format!("T{}", id), rank, pop, pop * 2.0 + 1.0).unwrap()
    }

    fn sample() -> TierArena {
        let mut arena = TierArena::new(tier(1, TierRank::Megasegment, 0.0)).unwrap();
        arena.add_child(TierId(1), tier(2, TierRank::Subsection, 0.0)).unwrap();
        arena.add_child(TierId(1), tier(3, TierRank::Subsection, 500.0)).unwrap();
        arena.add_child(TierId(2), tier(4, TierRank::Region, 100.0)).unwrap();
        arena.add_child(TierId(2), tier(5, TierRank::Region, 200.0)).unwrap();
        arena
    }

    #[test]
    fn test_total_population_is_recursive_leaf_sum() {
        let arena = sample();
        assert_eq!(arena.total_population(TierId(2)), 300.0);
        assert_eq!(arena.total_population(TierId(1)), 800.0);
        assert_eq!(arena.total_population(TierId(4)), 100.0);
    }

    #[test]
    fn test_leaves_under_skips_inner_tiers() {
        let arena = sample();
        assert_eq!(arena.leaves_under(TierId(1)), vec![TierId(4), TierId(5), TierId(3)]);
        assert_eq!(arena.leaves_under(TierId(2)), vec![TierId(4), TierId(5)]);
        assert!(arena.leaves_under(TierId(3)).is_empty());
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let arena = sample();
        let order = arena.post_order();
        let pos = |id: u32| order.iter().position(|t| *t == TierId(id)).unwrap();
        assert!(pos(4) < pos(2));
        assert!(pos(5) < pos(2));
        assert!(pos(2) < pos(1));
        assert!(pos(3) < pos(1));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut arena = sample();
        let err = arena.add_child(TierId(1), tier(4, TierRank::Subsection, 1.0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTier(TierId(4))));
    }

    #[test]
    fn test_rank_order_enforced() {
        let mut arena = sample();
        let err = arena.add_child(TierId(4), tier(9, TierRank::Region, 1.0)).unwrap_err();
        assert!(matches!(err, EngineError::RankOrder { .. }));
    }

    #[test]
    fn test_reparent_cycle_rejected() {
        let mut arena = sample();
        let err = arena.reparent(TierId(2), TierId(4)).unwrap_err();
        assert!(matches!(err, EngineError::CyclicHierarchy(TierId(2))));
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let mut arena = sample();
        arena.reparent(TierId(5), TierId(3)).unwrap();
        assert_eq!(arena.children(TierId(3)), &[TierId(5)]);
        assert_eq!(arena.children(TierId(2)), &[TierId(4)]);
        assert_eq!(arena.ancestors(TierId(5)), vec![TierId(3), TierId(1)]);
    }

    #[test]
    fn test_pair_mut_returns_both_orders() {
        let mut arena = sample();
        let (a, b) = arena.pair_mut(TierId(5), TierId(2)).unwrap();
        assert_eq!(a.id, TierId(5));
        assert_eq!(b.id, TierId(2));
        assert!(arena.pair_mut(TierId(2), TierId(2)).is_none());
    }

    #[test]
    fn test_depth_first_depths() {
        let arena = sample();
        let walk = arena.depth_first();
        assert_eq!(walk[0], (0, TierId(1)));
        assert!(walk.contains(&(2, TierId(5))));
    }

    #[test]
    fn test_mode_invariant() {
        let mut arena = sample();
        arena.get_mut(TierId(4)).unwrap().set_mode(TierMode::Active);
        assert!(arena.validate_modes().is_err());
        arena.get_mut(TierId(2)).unwrap().set_mode(TierMode::SemiActive);
        arena.get_mut(TierId(1)).unwrap().set_mode(TierMode::SemiActive);
        assert!(arena.validate_modes().is_ok());
        assert!(!arena.is_under_active(TierId(4)));
    }
}
