use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Context shipped to an external agent call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentContext {
    pub product_id: String,
    pub payload: Value,
}

impl AgentContext {
    pub fn new(product_id: impl Into<String>, payload: Value) -> Self {
        Self {
            product_id: product_id.into(),
            payload,
        }
    }
}

/// Best-effort structured suggestions from an out-of-core collaborator
/// (an LLM service). The core validates every response and may discard it;
/// no call site depends on agent success.
#[async_trait]
pub trait ExternalAgent: Send + Sync {
    /// Category / attribute classification for the given context.
    async fn classify(&self, context: &AgentContext) -> Result<Value>;

    /// Rank the supplied candidates.
    async fn rank(&self, context: &AgentContext, candidates: &[String]) -> Result<Value>;

    /// Free-form composition assistance (e.g. query suggestions).
    async fn compose(&self, context: &AgentContext) -> Result<Value>;
}

/// Tagged result of a fallible agent call site: either the agent's answer
/// or the call site's deterministic fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome<T> {
    Agent(T),
    Fallback(T),
}

impl<T> AgentOutcome<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Agent(value) | Self::Fallback(value) => value,
        }
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Agent that always fails, forcing every call site through its fallback.
/// The default when no collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAgent;

#[async_trait]
impl ExternalAgent for DisabledAgent {
    async fn classify(&self, _context: &AgentContext) -> Result<Value> {
        Err(AgentError::Disabled)
    }

    async fn rank(&self, _context: &AgentContext, _candidates: &[String]) -> Result<Value> {
        Err(AgentError::Disabled)
    }

    async fn compose(&self, _context: &AgentContext) -> Result<Value> {
        Err(AgentError::Disabled)
    }
}
