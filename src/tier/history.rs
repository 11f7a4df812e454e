//! Bounded per-tier historical event log

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{Resource, ResearchField, Tick, TierId};

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    // Random catalogue events
    Plague,
    War,
    GoldenAge,
    Breakthrough,
    Discovery,
    Unrest,
    Boom,
    Shortage,
    Pandemic,

    // Emitted by the statistical model
    TechBreakthrough { level: u8 },
    ResourceShortage { resource: Resource },

    // Research
    ScientistEmerged { field: ResearchField, rarity: u8 },
    PaperPublished { field: ResearchField, tier: u8 },

    // Carried over from the entity engine on zoom-out
    Recorded,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Plague => "plague",
            EventKind::War => "war",
            EventKind::GoldenAge => "golden_age",
            EventKind::Breakthrough => "breakthrough",
            EventKind::Discovery => "discovery",
            EventKind::Unrest => "unrest",
            EventKind::Boom => "boom",
            EventKind::Shortage => "shortage",
            EventKind::Pandemic => "pandemic",
            EventKind::TechBreakthrough { .. } => "tech_breakthrough",
            EventKind::ResourceShortage { .. } => "resource_shortage",
            EventKind::ScientistEmerged { .. } => "scientist_emerged",
            EventKind::PaperPublished { .. } => "paper_published",
            EventKind::Recorded => "recorded",
        }
    }
}

/// A historical event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub id: u64,
    pub tick: Tick,
    pub tier: TierId,
    pub kind: EventKind,
    pub description: String,
    /// Severity in [0, 1]
    pub severity: f64,
}

/// The last `capacity` events of a tier, oldest evicted first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<HistoricalEvent>,
    capacity: usize,
    next_event_id: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_event_id: 0,
        }
    }

    pub fn add_event(
        &mut self,
        tier: TierId,
        tick: Tick,
        kind: EventKind,
        description: impl Into<String>,
        severity: f64,
    ) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;

        self.push(HistoricalEvent {
            id,
            tick,
            tier,
            kind,
            description: description.into(),
            severity: severity.clamp(0.0, 1.0),
        });

        id
    }

    /// Append an already-built event (keeps its id), evicting the oldest if full
    pub fn push(&mut self, event: HistoricalEvent) {
        self.next_event_id = self.next_event_id.max(event.id + 1);
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.events.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoricalEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&HistoricalEvent> {
        self.events.back()
    }

    pub fn events_of<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a HistoricalEvent> + 'a {
        self.events.iter().filter(move |e| e.kind.label() == label)
    }

    /// Change the capacity, dropping the oldest events if it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.truncate_to_recent(self.capacity);
    }

    /// Shrink to the `count` most recent events
    pub fn truncate_to_recent(&mut self, count: usize) {
        while self.events.len() > count {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_evicts_oldest_first() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.add_event(TierId(1), i, EventKind::Boom, format!("boom {}", i), 0.5);
        }
        assert_eq!(log.len(), 3);
        let ids: Vec<u64> = log.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_push_keeps_ids_unique() {
        let mut log = EventLog::default();
        log.push(HistoricalEvent {
            id: 41,
            tick: 0,
            tier: TierId(1),
            kind: EventKind::Recorded,
            description: "founding".into(),
            severity: 0.2,
        });
        let next = log.add_event(TierId(1), 1, EventKind::War, "border war", 0.7);
        assert_eq!(next, 42);
    }

    #[test]
    fn test_severity_clamped() {
        let mut log = EventLog::default();
        log.add_event(TierId(1), 0, EventKind::Plague, "plague", 3.0);
        assert_eq!(log.latest().unwrap().severity, 1.0);
    }
}
