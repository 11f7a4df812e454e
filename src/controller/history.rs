//! Time series of world totals for charting

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::Tick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub tick: Tick,
    /// Simulated years elapsed at the root tier
    pub simulated_years: f64,
    pub population: f64,
    /// Yearly production over all leaf tiers
    pub production: f64,
    pub consumption: f64,
    pub trade_volume: f64,
    /// Population-weighted mean tech efficiency
    pub efficiency: f64,
}

/// The last `capacity` samples, oldest evicted first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationHistory {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl SimulationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: HistorySample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn samples(&self) -> impl DoubleEndedIterator<Item = &HistorySample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One column of the series, e.g. for a population chart
    pub fn series<F: Fn(&HistorySample) -> f64>(&self, column: F) -> Vec<f64> {
        self.samples.iter().map(column).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.samples)?)
    }
}
