//! One-retry structured decoding on top of a [`ReasoningService`].

use crate::reasoning::{
    domain::ReasoningPrompt,
    ports::{ReasoningError, ReasoningService},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decodes reasoning output into a typed decision.
///
/// A response that fails to parse is retried once with the strict-output
/// instruction. A second parse failure is final and reported as
/// [`ReasoningError::MalformedOutput`].
pub struct StructuredReasoner<S>
where
    S: ReasoningService + ?Sized,
{
    service: Arc<S>,
}

impl<S> Clone for StructuredReasoner<S>
where
    S: ReasoningService + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S> StructuredReasoner<S>
where
    S: ReasoningService + ?Sized,
{
    /// Wraps a reasoning service.
    #[must_use]
    pub const fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Sends `prompt` and decodes the answer as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError::Unavailable`] when the service fails on
    /// either attempt, or [`ReasoningError::MalformedOutput`] when both
    /// answers fail to decode.
    pub async fn decide<T>(&self, prompt: &ReasoningPrompt) -> Result<T, ReasoningError>
    where
        T: DeserializeOwned,
    {
        let first = self.service.complete(prompt).await?;
        let detail = match parse::<T>(&first) {
            Ok(decision) => return Ok(decision),
            Err(detail) => detail,
        };
        warn!(step = %prompt.step(), %detail, "malformed reasoning output, retrying strictly");

        let strict = prompt.clone().into_strict();
        let second = self.service.complete(&strict).await?;
        parse::<T>(&second).map_err(|retry_detail| ReasoningError::MalformedOutput {
            step: prompt.step(),
            detail: retry_detail,
        })
    }
}

fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let candidate = extract_object(raw).ok_or_else(|| "no JSON object in output".to_owned())?;
    serde_json::from_str(candidate).map_err(|err| {
        debug!(error = %err, "reasoning output rejected by schema");
        err.to_string()
    })
}

/// Returns the outermost `{...}` span, ignoring fences and surrounding prose.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}
