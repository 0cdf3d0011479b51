mod corpus;
mod embedder;
mod error;
mod index;
mod planner;

pub use corpus::{CorpusEntry, KeywordCorpus, KEYWORD_CORPUS_SCHEMA_VERSION};
pub use embedder::{Embedder, HashEmbedder};
pub use error::{IndexError, Result};
pub use index::KeywordIndex;
pub use planner::QueryPlanner;
