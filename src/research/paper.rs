//! Research papers and the catalogue they are started from

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{InstitutionId, PaperId, ResearchField};

/// Identity of a paper across tiers: one per field and tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaperKey {
    pub field: ResearchField,
    pub tier: u8,
}

/// A long-horizon, multi-institution research effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPaper {
    pub id: PaperId,
    pub field: ResearchField,
    /// Paper tier 1-100
    pub tier: u8,
    pub prerequisites: Vec<PaperKey>,
    pub required_guilds: u32,
    /// Rarity tier -> specialists needed at or above it
    pub required_specialists: BTreeMap<u8, u32>,
    pub estimated_years: f64,
    /// Progress in [0, 100]
    pub progress: f64,
    pub collaborating_institutions: Vec<InstitutionId>,
    /// Consecutive yearly ticks the paper could not be staffed
    pub stalled_years: u32,
}

impl ResearchPaper {
    pub fn key(&self) -> PaperKey {
        PaperKey { field: self.field, tier: self.tier }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100.0
    }

    pub fn collaborating_guilds(&self) -> u32 {
        self.collaborating_institutions
            .iter()
            .filter(|i| matches!(i, InstitutionId::Guild(_)))
            .count() as u32
    }

    /// Progress gained per fully staffed simulated year
    pub fn yearly_progress(&self) -> f64 {
        if self.estimated_years > 0.0 {
            100.0 / self.estimated_years
        } else {
            100.0
        }
    }
}

/// Template a tier starts papers from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperDefinition {
    pub field: ResearchField,
    pub tier: u8,
    pub prerequisites: Vec<PaperKey>,
    pub required_guilds: u32,
    pub required_specialists: BTreeMap<u8, u32>,
    pub estimated_years: f64,
}

impl PaperDefinition {
    pub fn key(&self) -> PaperKey {
        PaperKey { field: self.field, tier: self.tier }
    }

    pub fn instantiate(&self, id: PaperId, institutions: Vec<InstitutionId>) -> ResearchPaper {
        ResearchPaper {
            id,
            field: self.field,
            tier: self.tier,
            prerequisites: self.prerequisites.clone(),
            required_guilds: self.required_guilds,
            required_specialists: self.required_specialists.clone(),
            estimated_years: self.estimated_years,
            progress: 0.0,
            collaborating_institutions: institutions,
            stalled_years: 0,
        }
    }
}

/// All papers that can be researched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperCatalogue {
    definitions: Vec<PaperDefinition>,
}

impl Default for PaperCatalogue {
    /// One paper per field every ten tiers, each building on the previous one
    fn default() -> Self {
        let mut definitions = Vec::new();
        for field in ResearchField::ALL {
            for step in 1..=10u8 {
                let tier = step * 10;
                let prerequisites = if step > 1 {
                    vec![PaperKey { field, tier: tier - 10 }]
                } else {
                    Vec::new()
                };

                let mut required_specialists = BTreeMap::new();
                required_specialists.insert(tier, 1);
                required_specialists.insert(tier / 2, (tier / 10) as u32);

                definitions.push(PaperDefinition {
                    field,
                    tier,
                    prerequisites,
                    required_guilds: (tier / 30) as u32,
                    required_specialists,
                    estimated_years: 2.0 + tier as f64 / 5.0,
                });
            }
        }
        Self { definitions }
    }
}

impl PaperCatalogue {
    pub fn new(definitions: Vec<PaperDefinition>) -> Self {
        Self { definitions }
    }

    pub fn get(&self, key: PaperKey) -> Option<&PaperDefinition> {
        self.definitions.iter().find(|d| d.key() == key)
    }

    pub fn all(&self) -> &[PaperDefinition] {
        &self.definitions
    }

    /// Definitions whose prerequisites are all satisfied by `is_published`
    pub fn available<'a, F>(&'a self, is_published: F) -> impl Iterator<Item = &'a PaperDefinition> + 'a
    where
        F: Fn(&PaperKey) -> bool + 'a,
    {
        self.definitions
            .iter()
            .filter(move |d| d.prerequisites.iter().all(|p| is_published(p)))
    }
}
