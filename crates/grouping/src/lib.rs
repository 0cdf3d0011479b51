mod error;
mod grouper;
mod morphology;
mod sanitize;
mod selector;
mod stability;

pub use error::{CurationError, Result};
pub use grouper::{SemanticGroup, SemanticGrouper};
pub use morphology::normalize_morphology;
pub use sanitize::{sanitize_candidate, Sanitized};
pub use selector::{ChampionSelector, Selection};
pub use stability::{FileStabilityStore, MemoryStabilityStore, StabilityStore};
