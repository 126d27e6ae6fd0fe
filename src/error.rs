use crate::mixture::MixtureModel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid input '{argument}': {reason}")]
    InvalidInput {
        argument: &'static str,
        reason: String,
    },

    /// EM ran out of iterations. `partial` is the last model it produced.
    #[error("Mixture fit did not converge after {iterations} iterations")]
    FitDidNotConverge {
        iterations: usize,
        partial: Box<MixtureModel>,
    },
}

impl ReconError {
    pub fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        ReconError::InvalidInput {
            argument,
            reason: reason.into(),
        }
    }
}

pub type ReconResult<T> = Result<T, ReconError>;
