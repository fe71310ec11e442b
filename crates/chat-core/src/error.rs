//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

/// A misconfiguration rejected locally, before any external call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid parameter: {0}")]
pub struct InvalidParameterError(pub String);

/// The embedding provider was unreachable, refused the request or returned
/// output that could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Embedding service error ({provider}): {message}")]
pub struct EmbeddingServiceError {
    pub provider: String,
    pub message: String,
}

impl EmbeddingServiceError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wraps an `anyhow` chain, keeping every context layer in the message.
    pub fn from_anyhow(provider: impl Into<String>, err: anyhow::Error) -> Self {
        Self::new(provider, format!("{err:#}"))
    }
}

/// The generation service failed: bad credential, rate limit, network or a
/// malformed completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Generation service error ({provider}): {message}")]
pub struct GenerationServiceError {
    pub provider: String,
    pub message: String,
}

impl GenerationServiceError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn from_anyhow(provider: impl Into<String>, err: anyhow::Error) -> Self {
        Self::new(provider, format!("{err:#}"))
    }
}
