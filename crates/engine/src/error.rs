use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    #[error(
        "Budget infeasible: locked tokens need {required_chars} chars but the maximum is {max_chars}"
    )]
    BudgetInfeasible {
        required_chars: usize,
        max_chars: usize,
    },

    #[error("Curation error: {0}")]
    Curation(#[from] curator_grouping::CurationError),

    #[error("Cancelled at stage boundary: {stage}")]
    Cancelled { stage: &'static str },
}
