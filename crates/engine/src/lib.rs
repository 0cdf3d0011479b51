mod allocator;
mod engine;
mod error;
mod validator;
mod zones;

pub use allocator::{Allocation, ZoneAllocator};
pub use engine::{CancelFlag, ComposeRequest, TitleEngine};
pub use error::{EngineError, Result};
pub use validator::{enforce, Enforcement};
pub use zones::{Zone, ZoneSet};
