//! Placeholder document renderer.

use crate::deal::domain::{Deal, DealId, Lead};
use crate::workflow::ports::{DocumentError, DocumentGenerator, DocumentTemplate};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Renders a one-line text stand-in for each document and records the calls.
#[derive(Debug, Default)]
pub struct StaticDocumentGenerator {
    rendered: Mutex<Vec<(DealId, DocumentTemplate)>>,
    failing: AtomicBool,
}

impl StaticDocumentGenerator {
    /// Creates a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every render fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the documents rendered so far.
    #[must_use]
    pub fn rendered(&self) -> Vec<(DealId, DocumentTemplate)> {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DocumentGenerator for StaticDocumentGenerator {
    async fn render(
        &self,
        deal: &Deal,
        lead: &Lead,
        template: DocumentTemplate,
    ) -> Result<Vec<u8>, DocumentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DocumentError(format!("{template} renderer offline")));
        }
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((deal.id(), template));
        let total = deal
            .pricing()
            .map_or_else(|| "unpriced".to_owned(), |pricing| pricing.total().to_string());
        Ok(format!("{template} for {} ({}) total {total}", lead.company_name(), deal.id()).into_bytes())
    }
}
