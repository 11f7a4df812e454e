//! Strata - hierarchical abstraction and renormalization engine
//!
//! Simulates a seven-rank spatial hierarchy (tile up to gigasegment) where
//! most tiers run as statistics and a few are handed to an external
//! entity-simulation engine. Zooming moves a tier between the two.

pub mod controller;
pub mod core;
pub mod renormalization;
pub mod research;
pub mod simulation;
pub mod tier;
