//! Research drafted by the reasoning service.

use crate::deal::domain::OrganizationId;
use crate::lifecycle::ports::{ContentResearcher, ResearchError};
use crate::reasoning::{
    domain::{ReasoningPrompt, ReasoningStep},
    ports::ReasoningService,
    services::StructuredReasoner,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const RESEARCH_INSTRUCTIONS: &str = "\
You prepare the periodic market brief for a B2B sales team. Respond with one \
JSON object with the fields \"summary\" (a short paragraph) and \"topics\" \
(a list of content ideas for outreach).";

#[derive(Debug, Deserialize)]
struct ResearchBrief {
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
}

/// Researcher that asks the reasoning service for a market brief.
pub struct ReasoningResearcher<S>
where
    S: ReasoningService + ?Sized,
{
    reasoner: StructuredReasoner<S>,
    focus: String,
}

impl<S> ReasoningResearcher<S>
where
    S: ReasoningService + ?Sized,
{
    /// Creates a researcher briefing on `focus` (e.g. the product line).
    #[must_use]
    pub fn new(service: Arc<S>, focus: impl Into<String>) -> Self {
        Self {
            reasoner: StructuredReasoner::new(service),
            focus: focus.into(),
        }
    }
}

#[async_trait]
impl<S> ContentResearcher for ReasoningResearcher<S>
where
    S: ReasoningService + ?Sized,
{
    async fn research(&self, organization_id: OrganizationId) -> Result<String, ResearchError> {
        let prompt = ReasoningPrompt::new(
            ReasoningStep::Research,
            RESEARCH_INSTRUCTIONS,
            format!("Organisation: {organization_id}\nFocus: {}", self.focus),
        );
        let brief: ResearchBrief = self
            .reasoner
            .decide(&prompt)
            .await
            .map_err(|err| ResearchError(err.to_string()))?;
        if brief.topics.is_empty() {
            Ok(brief.summary)
        } else {
            Ok(format!("{}\nTopics: {}", brief.summary, brief.topics.join("; ")))
        }
    }
}
