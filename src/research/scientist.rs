//! Individual specialists

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::ResearchConfig;
use crate::core::types::{EntityId, InstitutionId, PaperId, ResearchField};
use crate::tier::preserved::NamedEntity;

const GIVEN_NAMES: &[&str] = &[
    "Ada", "Bruno", "Cyra", "Dorian", "Elif", "Farid", "Greta", "Hiro", "Ines", "Jonas",
    "Kaveh", "Lena", "Mirek", "Noor", "Oskar", "Priya", "Quill", "Rosa", "Soren", "Talia",
];

const FAMILY_NAMES: &[&str] = &[
    "Abara", "Brandt", "Castell", "Draven", "Eskildsen", "Fournier", "Galan", "Hollis",
    "Ivers", "Jaramillo", "Kestrel", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
];

/// A specialist produced by the emergence model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scientist {
    pub id: EntityId,
    pub name: String,
    /// Rarity tier 0-100
    pub rarity_tier: u8,
    pub field: ResearchField,
    pub specializations: Vec<String>,
    pub age: f64,
    pub lifespan: f64,
    pub current_paper: Option<PaperId>,
    pub university: Option<InstitutionId>,
    pub fame: f64,
}

impl Scientist {
    /// Roll a new specialist: age 25-40, lifespan rising toward 200 years at tier 100
    pub fn generate<R: Rng>(
        rng: &mut R,
        field: ResearchField,
        rarity_tier: u8,
        university: Option<InstitutionId>,
        config: &ResearchConfig,
    ) -> Self {
        let id = EntityId::from_random_bytes(rng.gen());
        let name = format!(
            "{} {}",
            GIVEN_NAMES.choose(rng).copied().unwrap_or("Unnamed"),
            FAMILY_NAMES.choose(rng).copied().unwrap_or("Scholar"),
        );

        let pool = field.specialization_pool();
        let count = rng.gen_range(1..=pool.len().min(3));
        let specializations = pool
            .choose_multiple(rng, count)
            .map(|s| s.to_string())
            .collect();

        let age = rng.gen_range(config.min_emergence_age..=config.max_emergence_age);
        let lifespan = lifespan_for(rarity_tier, config) * rng.gen_range(0.9..=1.0);

        Self {
            id,
            name,
            rarity_tier: rarity_tier.min(100),
            field,
            specializations,
            age,
            // Always leaves at least a few working years
            lifespan: lifespan.max(age + 5.0),
            current_paper: None,
            university,
            fame: rarity_tier as f64 * 0.5,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.age < self.lifespan
    }

    pub fn is_available(&self) -> bool {
        self.current_paper.is_none()
    }

    pub fn to_named_entity(&self) -> NamedEntity {
        NamedEntity {
            id: self.id,
            name: self.name.clone(),
            role: "scientist".to_string(),
            fame: self.fame,
            rarity_tier: Some(self.rarity_tier),
            field: Some(self.field),
        }
    }
}

/// Expected lifespan for a rarity tier: quadratic ramp from base to max
pub fn lifespan_for(rarity_tier: u8, config: &ResearchConfig) -> f64 {
    let t = (rarity_tier.min(100) as f64) / 100.0;
    config.base_lifespan + (config.max_lifespan - config.base_lifespan) * t * t
}
