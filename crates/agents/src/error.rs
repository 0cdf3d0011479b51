use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent call failed: {0}")]
    Failed(String),

    #[error("Agent returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Agent is disabled")]
    Disabled,
}
