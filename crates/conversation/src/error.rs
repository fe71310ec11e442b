use chat_core::{GenerationServiceError, InvalidParameterError};
use retrieval::RetrievalError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a turn failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Contextualize,
    Retrieve,
    Generate,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::Contextualize => "contextualize",
            TurnStage::Retrieve => "retrieve",
            TurnStage::Generate => "generate",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(InvalidParameterError),

    #[error("Contextualization failed: {0}")]
    Contextualize(GenerationServiceError),

    #[error("Retrieval failed: {0}")]
    Retrieve(RetrievalError),

    #[error("Answer generation failed: {0}")]
    Generate(GenerationServiceError),

    #[error("{stage} stage timed out after {after:?}")]
    Timeout { stage: TurnStage, after: Duration },
}

impl TurnError {
    /// The stage that failed, `None` when the turn was rejected up front.
    pub fn stage(&self) -> Option<TurnStage> {
        match self {
            TurnError::InvalidInput(_) => None,
            TurnError::Contextualize(_) => Some(TurnStage::Contextualize),
            TurnError::Retrieve(_) => Some(TurnStage::Retrieve),
            TurnError::Generate(_) => Some(TurnStage::Generate),
            TurnError::Timeout { stage, .. } => Some(*stage),
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            TurnError::InvalidInput(_) => 400,
            TurnError::Retrieve(RetrievalError::InvalidParameter(_)) => 500,
            TurnError::Contextualize(_) => 502,
            TurnError::Retrieve(RetrievalError::Embedding(_)) => 502,
            TurnError::Generate(_) => 503,
            TurnError::Timeout { .. } => 504,
        }
    }

    /// True when asking the same question again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::InvalidInput(_) => false,
            TurnError::Retrieve(RetrievalError::InvalidParameter(_)) => false,
            TurnError::Contextualize(_) => true,
            TurnError::Retrieve(RetrievalError::Embedding(_)) => true,
            TurnError::Generate(_) => true,
            TurnError::Timeout { .. } => true,
        }
    }
}
