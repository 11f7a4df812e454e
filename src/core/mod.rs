pub mod config;
pub mod error;
pub mod time_scale;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use time_scale::{TimeScaleTable, MINUTES_PER_YEAR};
