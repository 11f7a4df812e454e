//! Yearly emergence probability of a rare specialist
//!
//! probability = base × population × infrastructure × stability × activity
//!
//! Every modifier is a pure function of its inputs so each can be checked on
//! its own. Rarity tiers are on the 0-100 scientist scale.

use crate::core::config::ResearchConfig;
use crate::core::types::ResearchField;
use crate::tier::AbstractTier;

/// Everything the probability depends on, extracted from a tier
#[derive(Debug, Clone, PartialEq)]
pub struct EmergenceInputs {
    pub population: f64,
    /// Σ university.tier², field-weighted
    pub university_strength: f64,
    /// Σ guild.tier × influence, field-weighted
    pub guild_influence: f64,
    /// Consecutive simulated years of sustained stability
    pub stable_years: f64,
    /// Tiers of papers in progress in the target field
    pub active_paper_tiers: Vec<u8>,
    pub published_papers: usize,
}

/// Institutions dedicated to another field count at half weight
fn field_weight(institution_field: Option<ResearchField>, field: ResearchField) -> f64 {
    match institution_field {
        Some(f) if f != field => 0.5,
        _ => 1.0,
    }
}

impl EmergenceInputs {
    pub fn from_tier(tier: &AbstractTier, field: ResearchField) -> Self {
        Self {
            population: tier.population.total,
            university_strength: tier
                .universities
                .iter()
                .map(|u| u.strength() * field_weight(u.field, field))
                .sum(),
            guild_influence: tier
                .research_guilds
                .iter()
                .map(|g| g.weight() * field_weight(g.field, field))
                .sum(),
            stable_years: tier.research.stable_years,
            active_paper_tiers: tier
                .research
                .papers
                .iter()
                .filter(|p| p.field == field)
                .map(|p| p.tier)
                .collect(),
            published_papers: tier.research.published_count(),
        }
    }
}

/// Geometric falloff: 0.1/yr at tier 50, 1e-8/yr at tier 100
pub fn base_probability(rarity: u8, config: &ResearchConfig) -> f64 {
    let exponent = -config.probability_decade_per_tier * (rarity as f64 - 50.0);
    (config.base_probability_tier50 * 10f64.powf(exponent)).min(1.0)
}

/// Population (in billions) at which the population modifier is exactly 1
pub fn required_population_billions(rarity: u8, config: &ResearchConfig) -> f64 {
    10f64.powf((rarity as f64 - config.population_reference_tier) / config.population_decade_tiers)
}

pub fn population_modifier(population: f64, rarity: u8, config: &ResearchConfig) -> f64 {
    if population.is_nan() || population <= 0.0 {
        return 0.0;
    }
    let ratio = (population / 1e9) / required_population_billions(rarity, config);
    ratio.sqrt().min(config.max_population_modifier)
}

/// University strength and guild influence, each normalised to the target tier.
/// From the bottleneck tier up the weaker input decides; below it they average.
pub fn infrastructure_modifier(
    university_strength: f64,
    guild_influence: f64,
    rarity: u8,
    config: &ResearchConfig,
) -> f64 {
    let t = rarity as f64;
    if t <= 0.0 {
        return config.max_infrastructure_modifier;
    }
    let university = university_strength.max(0.0) / ((t / 10.0).powi(2) * 10.0);
    let guild = guild_influence.max(0.0) / (t * 5.0);

    let combined = if rarity >= config.bottleneck_tier {
        university.min(guild)
    } else {
        (university + guild) / 2.0
    };
    combined.min(config.max_infrastructure_modifier)
}

/// Zero below half the requirement, linear ramp to 1, logarithmic bonus beyond
pub fn stability_modifier(stable_years: f64, rarity: u8, config: &ResearchConfig) -> f64 {
    let required = config.stability_years_per_tier * rarity as f64;
    if required <= 0.0 {
        return 1.0;
    }
    let half = required / 2.0;
    let years = stable_years.max(0.0);
    if years < half {
        0.0
    } else if years < required {
        (years - half) / half
    } else {
        1.0 + (years / required).ln()
    }
}

pub fn research_activity_modifier(
    active_paper_tiers: &[u8],
    published_papers: usize,
    rarity: u8,
    config: &ResearchConfig,
) -> f64 {
    let floor = config.active_research_fraction * rarity as f64;
    let active = active_paper_tiers.iter().filter(|t| **t as f64 >= floor).count();
    if active == 0 {
        return config.inactive_research_penalty;
    }
    (1.0 + (1.0 + active as f64).ln()) * (1.0 + (1.0 + published_papers as f64).ln())
}

/// Combined yearly probability, clamped to [0, 1]
pub fn yearly_probability(inputs: &EmergenceInputs, rarity: u8, config: &ResearchConfig) -> f64 {
    let p = base_probability(rarity, config)
        * population_modifier(inputs.population, rarity, config)
        * infrastructure_modifier(inputs.university_strength, inputs.guild_influence, rarity, config)
        * stability_modifier(inputs.stable_years, rarity, config)
        * research_activity_modifier(&inputs.active_paper_tiers, inputs.published_papers, rarity, config);
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
