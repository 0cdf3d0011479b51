mod extract;
mod normalize;
mod patterns;
pub mod vocab;

pub use extract::{extract, Extraction, ParseWarning};
pub use normalize::{normalize, NormalizedTitle};
