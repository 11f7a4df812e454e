//! ResearchEmergenceSystem - yearly specialist emergence and paper progress
//!
//! Works on one tier at a time through its own fields. Simulated time is
//! accumulated per tier and consumed in whole years, so a chunk that ticks
//! every minute and a gigasegment that ticks every year run the same number
//! of yearly passes over the same simulated span.

use std::collections::BTreeMap;

use rand::Rng;

use crate::core::config::{EngineConfig, ResearchConfig, TechConfig};
use crate::core::types::{EntityId, InstitutionId, PaperId, ResearchField, Tick};
use crate::research::emergence::{self, EmergenceInputs};
use crate::research::paper::{PaperCatalogue, PaperKey};
use crate::research::scientist::Scientist;
use crate::research::state::EmergenceState;
use crate::tier::{AbstractTier, EventKind};

/// What happened during one yearly pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearReport {
    pub emerged: Vec<EntityId>,
    pub deaths: usize,
    pub graduates: u32,
    pub retired: u32,
    pub started: Vec<PaperId>,
    pub stalled: Vec<PaperId>,
    pub published: Vec<PaperKey>,
}

#[derive(Debug, Clone)]
pub struct ResearchEmergenceSystem {
    config: ResearchConfig,
    tech: TechConfig,
    catalogue: PaperCatalogue,
}

impl ResearchEmergenceSystem {
    pub fn new(config: ResearchConfig, tech: TechConfig, catalogue: PaperCatalogue) -> Self {
        Self { config, tech, catalogue }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.research.clone(), config.tech.clone(), PaperCatalogue::default())
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn catalogue(&self) -> &PaperCatalogue {
        &self.catalogue
    }

    /// Yearly probability that a specialist of `rarity` emerges in `field`
    pub fn yearly_probability(&self, tier: &AbstractTier, field: ResearchField, rarity: u8) -> f64 {
        let inputs = EmergenceInputs::from_tier(tier, field);
        emergence::yearly_probability(&inputs, rarity, &self.config)
    }

    /// Roll once for one (field, rarity) pair and update its state machine.
    /// Returns the new specialist's id on success.
    pub fn attempt_emergence<R: Rng>(
        &self,
        tier: &mut AbstractTier,
        field: ResearchField,
        rarity: u8,
        tick: Tick,
        rng: &mut R,
    ) -> Option<EntityId> {
        let year = tier.research.years_elapsed;
        let probability = self.yearly_probability(tier, field, rarity);
        let previous = tier.research.emergence_state(field, rarity);

        // Preconditions unmet: not an error, nothing to roll
        if probability <= 0.0 {
            if matches!(previous, EmergenceState::Candidate { .. }) {
                tier.research.set_emergence_state(field, rarity, EmergenceState::Dormant);
            }
            return None;
        }

        if !rng.gen_bool(probability) {
            let next = match previous {
                EmergenceState::Dormant => EmergenceState::Candidate { since_year: year, probability },
                EmergenceState::Candidate { since_year, .. } => EmergenceState::Candidate { since_year, probability },
                emerged @ EmergenceState::Emerged { .. } => emerged,
            };
            tier.research.set_emergence_state(field, rarity, next);
            return None;
        }

        let university = tier
            .universities
            .iter()
            .find(|u| u.field.map_or(true, |f| f == field))
            .map(|u| u.institution_id());
        let scientist = Scientist::generate(rng, field, rarity, university, &self.config);
        let id = scientist.id;

        let count = match previous {
            EmergenceState::Emerged { count, .. } => count + 1,
            _ => 1,
        };
        tier.research
            .set_emergence_state(field, rarity, EmergenceState::Emerged { count, last_year: year });

        tracing::info!(
            tier = %tier.id,
            ?field,
            rarity,
            name = %scientist.name,
            "specialist emerged"
        );
        let description = format!("{} emerged as a tier-{} {:?} specialist", scientist.name, rarity, field);
        tier.log_event(tick, EventKind::ScientistEmerged { field, rarity }, description, rarity as f64 / 100.0);
        tier.research.scientists.push(scientist);
        Some(id)
    }

    /// Accumulate `dt_years` and run one pass per whole simulated year
    pub fn advance<R: Rng>(&self, tier: &mut AbstractTier, dt_years: f64, tick: Tick, rng: &mut R) -> Vec<YearReport> {
        if dt_years.is_finite() && dt_years > 0.0 {
            tier.research.year_accumulator += dt_years;
        }
        let mut reports = Vec::new();
        // Tolerance absorbs float drift from summing many small deltas
        while tier.research.year_accumulator >= 1.0 - 1e-9 {
            tier.research.year_accumulator = (tier.research.year_accumulator - 1.0).max(0.0);
            reports.push(self.run_year(tier, tick, rng));
        }
        reports
    }

    /// One simulated year of research activity
    pub fn run_year<R: Rng>(&self, tier: &mut AbstractTier, tick: Tick, rng: &mut R) -> YearReport {
        let mut report = YearReport::default();
        tier.research.years_elapsed += 1;

        report.deaths = self.age_scientists(tier);
        report.graduates = self.graduate(tier);
        report.retired = self.retire_pool(tier, rng);

        for &rarity in &self.config.tracked_rarity_tiers {
            for field in ResearchField::ALL {
                if let Some(id) = self.attempt_emergence(tier, field, rarity, tick, rng) {
                    report.emerged.push(id);
                }
            }
        }

        report.started = self.start_papers(tier);
        report.stalled = self.progress_papers(tier);
        report.published = self.publish(tier, tick);
        report
    }

    fn age_scientists(&self, tier: &mut AbstractTier) -> usize {
        for scientist in &mut tier.research.scientists {
            scientist.age += 1.0;
        }
        let before = tier.research.scientists.len();
        tier.research.scientists.retain(Scientist::is_alive);
        let deaths = before - tier.research.scientists.len();
        if deaths > 0 {
            tracing::debug!(tier = %tier.id, deaths, "specialists died");
        }
        deaths
    }

    /// Every university adds one common specialist to the pool per year
    fn graduate(&self, tier: &mut AbstractTier) -> u32 {
        let mut graduates = 0;
        for university in &tier.universities {
            let rarity = (university.tier as u16 * 10).min(self.config.graduate_rarity_cap as u16) as u8;
            tier.scientist_pool.add(rarity, 1);
            graduates += 1;
        }
        graduates
    }

    /// Expected-value attrition: the whole part is removed, the remainder is rolled
    fn retire_pool<R: Rng>(&self, tier: &mut AbstractTier, rng: &mut R) -> u32 {
        let rate = self.config.pool_attrition_rate.clamp(0.0, 1.0);
        if rate <= 0.0 {
            return 0;
        }
        let counts: Vec<(u8, u32)> = tier.scientist_pool.iter().collect();
        let mut retired = 0;
        for (rarity, count) in counts {
            let expected = count as f64 * rate;
            let mut leaving = expected.floor() as u32;
            if rng.gen::<f64>() < expected.fract() {
                leaving += 1;
            }
            retired += tier.scientist_pool.remove(rarity, leaving);
        }
        retired
    }

    fn start_papers(&self, tier: &mut AbstractTier) -> Vec<PaperId> {
        let institutions = tier.universities.len() + tier.research_guilds.len();
        let capacity = institutions * self.config.papers_per_institution;
        let mut started = Vec::new();

        while tier.research.papers.len() < capacity {
            let next = self
                .catalogue
                .available(|k| tier.research.is_published(k))
                .filter(|d| !tier.research.is_published(&d.key()) && !tier.research.is_in_progress(&d.key()))
                .min_by_key(|d| (d.tier, d.field))
                .cloned();
            let Some(definition) = next else {
                break;
            };

            let mut collaborators: Vec<InstitutionId> = tier
                .universities
                .iter()
                .filter(|u| u.field.map_or(true, |f| f == definition.field))
                .map(|u| u.institution_id())
                .collect();
            collaborators.extend(
                tier.research_guilds
                    .iter()
                    .filter(|g| g.field.map_or(true, |f| f == definition.field))
                    .map(|g| g.institution_id()),
            );
            if collaborators.is_empty() {
                collaborators = tier.universities.iter().map(|u| u.institution_id()).collect();
            }

            let id = tier.research.next_paper_id();
            tracing::debug!(tier = %tier.id, field = ?definition.field, paper_tier = definition.tier, "paper started");
            tier.research.papers.push(definition.instantiate(id, collaborators));
            started.push(id);
        }
        started
    }

    /// Staff each paper from individuals and the pool; unstaffed papers stall
    fn progress_papers(&self, tier: &mut AbstractTier) -> Vec<PaperId> {
        for scientist in &mut tier.research.scientists {
            scientist.current_paper = None;
        }
        // Pool members can work on one paper per year
        let mut pool_available: BTreeMap<u8, u32> = tier.scientist_pool.iter().collect();
        let mut stalled = Vec::new();

        let mut order: Vec<usize> = (0..tier.research.papers.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(tier.research.papers[i].tier));

        for index in order {
            let paper = &tier.research.papers[index];
            let guilds_ok = paper.collaborating_guilds() >= paper.required_guilds;
            let allocation = if guilds_ok {
                allocate(
                    &paper.required_specialists,
                    paper.field,
                    &tier.research.scientists,
                    &pool_available,
                )
            } else {
                None
            };

            let paper = &mut tier.research.papers[index];
            match allocation {
                Some(allocation) => {
                    paper.progress = (paper.progress + paper.yearly_progress()).min(100.0);
                    paper.stalled_years = 0;
                    let paper_id = paper.id;
                    for i in allocation.individuals {
                        tier.research.scientists[i].current_paper = Some(paper_id);
                    }
                    for (rarity, used) in allocation.pooled {
                        if let Some(count) = pool_available.get_mut(&rarity) {
                            *count -= used.min(*count);
                        }
                    }
                }
                None => {
                    // Stalled papers keep their progress
                    paper.stalled_years += 1;
                    stalled.push(paper.id);
                }
            }
        }
        stalled
    }

    fn publish(&self, tier: &mut AbstractTier, tick: Tick) -> Vec<PaperKey> {
        let (done, ongoing): (Vec<_>, Vec<_>) = std::mem::take(&mut tier.research.papers)
            .into_iter()
            .partition(|p| p.is_complete());
        tier.research.papers = ongoing;

        let mut published = Vec::new();
        for paper in done {
            let key = paper.key();
            let fame = self.config.publication_fame * (paper.tier as f64 / 10.0);
            let mut authors = Vec::new();
            for scientist in tier.research.scientists.iter_mut().filter(|s| s.current_paper == Some(paper.id)) {
                scientist.fame += fame;
                scientist.current_paper = None;
                authors.push(scientist.name.clone());
            }

            let levels = tier
                .tech
                .add_research(self.tech.publication_boost * paper.tier as f64, self.tech.max_level);
            if !levels.is_empty() {
                tier.tech.recompute_efficiency(self.tech.efficiency_per_level);
                for level in levels {
                    tier.log_event(tick, EventKind::TechBreakthrough { level }, format!("Reached tech level {}", level), 0.5);
                }
            }

            tier.research.published.push(key);
            let by = if authors.is_empty() { "pooled specialists".to_string() } else { authors.join(", ") };
            tier.log_event(
                tick,
                EventKind::PaperPublished { field: paper.field, tier: paper.tier },
                format!("Tier-{} {:?} paper published by {}", paper.tier, paper.field, by),
                paper.tier as f64 / 100.0,
            );
            tracing::debug!(tier = %tier.id, field = ?paper.field, paper_tier = paper.tier, "paper published");
            published.push(key);
        }
        published
    }
}

/// Specialists committed to one paper for one year
#[derive(Debug, Default)]
struct Allocation {
    /// Indices into the tier's scientist list
    individuals: Vec<usize>,
    /// Rarity -> pooled specialists used
    pooled: BTreeMap<u8, u32>,
}

/// Greedy staffing from the highest requirement down. A specialist of higher
/// rarity satisfies a lower requirement; the least rare sufficient one is used.
fn allocate(
    required: &BTreeMap<u8, u32>,
    field: ResearchField,
    scientists: &[Scientist],
    pool: &BTreeMap<u8, u32>,
) -> Option<Allocation> {
    let mut allocation = Allocation::default();
    let mut pool_left = pool.clone();
    let mut candidates: Vec<usize> = scientists
        .iter()
        .enumerate()
        .filter(|(_, s)| s.field == field && s.is_available())
        .map(|(i, _)| i)
        .collect();
    candidates.sort_by_key(|&i| scientists[i].rarity_tier);

    for (&rarity, &count) in required.iter().rev() {
        let mut needed = count;
        while needed > 0 {
            if let Some(pos) = candidates.iter().position(|&i| scientists[i].rarity_tier >= rarity) {
                allocation.individuals.push(candidates.remove(pos));
                needed -= 1;
                continue;
            }
            let Some((&pooled_rarity, left)) = pool_left.range_mut(rarity..).find(|(_, c)| **c > 0) else {
                return None;
            };
            let take = needed.min(*left);
            *left -= take;
            needed -= take;
            *allocation.pooled.entry(pooled_rarity).or_insert(0) += take;
        }
    }
    Some(allocation)
}
