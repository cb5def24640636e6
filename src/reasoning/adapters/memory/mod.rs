//! Scripted reasoning service for tests and offline runs.

use crate::reasoning::{
    domain::ReasoningPrompt,
    ports::{ReasoningError, ReasoningService},
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Replays queued responses in order and records every prompt it receives.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    responses: Mutex<VecDeque<Result<String, ReasoningError>>>,
    prompts: Mutex<Vec<ReasoningPrompt>>,
}

impl ScriptedReasoner {
    /// Creates a reasoner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw text response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.queue(Ok(text.into()));
    }

    /// Queues a service failure.
    pub fn push_failure(&self, error: ReasoningError) {
        self.queue(Err(error));
    }

    /// Returns the prompts received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<ReasoningPrompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many queued responses remain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn queue(&self, response: Result<String, ReasoningError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, prompt: &ReasoningPrompt) -> Result<String, ReasoningError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(ReasoningError::Unavailable(
                    "no scripted response queued".to_owned(),
                ))
            })
    }
}
