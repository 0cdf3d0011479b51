mod agent;
mod error;
mod retry;

pub use agent::{AgentContext, AgentOutcome, DisabledAgent, ExternalAgent};
pub use error::{AgentError, Result};
pub use retry::{call_with_fallback, CallPolicy};
