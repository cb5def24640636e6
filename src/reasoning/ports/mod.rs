//! Port for the external reasoning service.

use crate::reasoning::domain::{ReasoningPrompt, ReasoningStep};
use async_trait::async_trait;
use thiserror::Error;

/// Reasoning failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReasoningError {
    /// The service could not be reached or refused the request.
    #[error("reasoning service unavailable: {0}")]
    Unavailable(String),

    /// The output did not match the step's schema, even after the strict retry.
    #[error("malformed {step} output: {detail}")]
    MalformedOutput {
        /// Step whose output was malformed.
        step: ReasoningStep,
        /// Parser failure for the last attempt.
        detail: String,
    },
}

/// External text-generation service.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Completes `prompt`, returning raw text expected to hold one JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError::Unavailable`] when the service fails.
    async fn complete(&self, prompt: &ReasoningPrompt) -> Result<String, ReasoningError>;
}
