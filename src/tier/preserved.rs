//! Entities that survive zoom-out/zoom-in round trips

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ResearchField};
use crate::tier::history::EventLog;

/// A named individual known to the entity engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: EntityId,
    pub name: String,
    pub role: String,
    pub fame: f64,
    /// Set for specialists (rarity tier 0-100)
    pub rarity_tier: Option<u8>,
    pub field: Option<ResearchField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Temple,
    University,
    Wonder,
    Hub,
    Guildhall,
    House,
    Workshop,
    Farm,
    Other,
}

impl BuildingKind {
    /// Kinds that survive a zoom-out
    pub fn is_major(&self) -> bool {
        matches!(
            self,
            BuildingKind::Temple | BuildingKind::University | BuildingKind::Wonder | BuildingKind::Hub
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: EntityId,
    pub name: String,
    pub kind: BuildingKind,
    /// Deity a temple is dedicated to
    pub deity: Option<String>,
    /// University tier or hub capacity class
    pub tier: u8,
}

/// Named entities above the fame threshold, major buildings and recent history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreservedEntities {
    pub entities: Vec<NamedEntity>,
    pub buildings: Vec<Building>,
    pub events: EventLog,
}

impl PreservedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, id: EntityId) -> Option<&NamedEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Insert or replace a named entity by id
    pub fn upsert_entity(&mut self, entity: NamedEntity) {
        match self.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    pub fn upsert_building(&mut self, building: Building) {
        match self.buildings.iter_mut().find(|b| b.id == building.id) {
            Some(existing) => *existing = building,
            None => self.buildings.push(building),
        }
    }

    /// Ids of everything preserved, sorted, for set comparisons
    pub fn identity(&self) -> PreservedIdentity {
        let mut entities: Vec<EntityId> = self.entities.iter().map(|e| e.id).collect();
        let mut buildings: Vec<EntityId> = self.buildings.iter().map(|b| b.id).collect();
        let mut events: Vec<u64> = self.events.iter().map(|e| e.id).collect();
        entities.sort();
        buildings.sort();
        events.sort();
        PreservedIdentity { entities, buildings, events }
    }
}

/// Sorted ids of a preserved set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedIdentity {
    pub entities: Vec<EntityId>,
    pub buildings: Vec<EntityId>,
    pub events: Vec<u64>,
}
