//! Document rendering port.

use crate::deal::domain::{Deal, Lead};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Document rendering failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("document rendering failed: {0}")]
pub struct DocumentError(pub String);

/// Which document to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentTemplate {
    /// Priced offer sent after approval.
    Offer,
    /// Invoice copy sent with the settlement confirmation.
    Invoice,
}

impl DocumentTemplate {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Invoice => "invoice",
        }
    }

    /// Returns the attachment file name for `deal`.
    #[must_use]
    pub fn file_name(self, deal: &Deal) -> String {
        format!("{}-{}.pdf", self.as_str(), deal.id())
    }
}

impl fmt::Display for DocumentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders deal documents.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Renders `template` for the deal's current pricing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when rendering fails.
    async fn render(
        &self,
        deal: &Deal,
        lead: &Lead,
        template: DocumentTemplate,
    ) -> Result<Vec<u8>, DocumentError>;
}
