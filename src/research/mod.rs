//! Rare-specialist emergence and long-horizon research papers

pub mod emergence;
pub mod paper;
pub mod scientist;
pub mod state;
pub mod system;

pub use emergence::EmergenceInputs;
pub use paper::{PaperCatalogue, PaperDefinition, PaperKey, ResearchPaper};
pub use scientist::Scientist;
pub use state::{EmergenceState, EmergenceTrack, ResearchState};
pub use system::{ResearchEmergenceSystem, YearReport};
