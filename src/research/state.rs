//! Tier-local research state

use serde::{Deserialize, Serialize};

use crate::core::types::{PaperId, ResearchField};
use crate::research::paper::{PaperKey, ResearchPaper};
use crate::research::scientist::Scientist;

/// Emergence progress of one (field, rarity tier) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EmergenceState {
    /// Preconditions unmet: yearly probability is zero
    Dormant,
    /// Rolling every year with a non-zero probability
    Candidate { since_year: u64, probability: f64 },
    /// At least one specialist has emerged
    Emerged { count: u32, last_year: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceTrack {
    pub field: ResearchField,
    pub rarity: u8,
    pub state: EmergenceState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// Individually tracked specialists
    pub scientists: Vec<Scientist>,
    /// Papers in progress
    pub papers: Vec<ResearchPaper>,
    /// Published papers, in publication order
    pub published: Vec<PaperKey>,
    pub emergence: Vec<EmergenceTrack>,
    /// Consecutive simulated years with `overall` at or above the stable threshold
    pub stable_years: f64,
    /// Simulated time not yet consumed by a yearly research pass
    pub year_accumulator: f64,
    pub years_elapsed: u64,
    next_paper_id: u32,
}

impl ResearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_paper_id(&mut self) -> PaperId {
        let id = PaperId(self.next_paper_id);
        self.next_paper_id += 1;
        id
    }

    pub fn is_published(&self, key: &PaperKey) -> bool {
        self.published.contains(key)
    }

    pub fn is_in_progress(&self, key: &PaperKey) -> bool {
        self.papers.iter().any(|p| p.key() == *key)
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    /// Papers in progress at or above `min_tier`
    pub fn active_papers_at_least(&self, min_tier: f64) -> usize {
        self.papers.iter().filter(|p| p.tier as f64 >= min_tier).count()
    }

    pub fn emergence_state(&self, field: ResearchField, rarity: u8) -> EmergenceState {
        self.emergence
            .iter()
            .find(|t| t.field == field && t.rarity == rarity)
            .map(|t| t.state.clone())
            .unwrap_or(EmergenceState::Dormant)
    }

    pub fn set_emergence_state(&mut self, field: ResearchField, rarity: u8, state: EmergenceState) {
        match self.emergence.iter_mut().find(|t| t.field == field && t.rarity == rarity) {
            Some(track) => track.state = state,
            None => self.emergence.push(EmergenceTrack { field, rarity, state }),
        }
    }

    pub fn scientist(&self, id: crate::core::types::EntityId) -> Option<&Scientist> {
        self.scientists.iter().find(|s| s.id == id)
    }
}
