//! Accounting port.

use crate::deal::domain::{Deal, Lead};
use async_trait::async_trait;
use thiserror::Error;

/// Invoice issuance failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvoiceError {
    /// The accounting system could not be reached; a local fallback applies.
    #[error("accounting system unavailable: {0}")]
    Unavailable(String),
    /// The accounting system refused the invoice.
    #[error("invoice rejected: {0}")]
    Rejected(String),
}

/// Issues invoices in the accounting system.
#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    /// Issues an invoice for the deal's pricing and returns its reference.
    ///
    /// Calls with the same `idempotency_key` must return the same reference
    /// without issuing a second invoice.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError`] when issuance fails.
    async fn issue(
        &self,
        deal: &Deal,
        lead: &Lead,
        idempotency_key: &str,
    ) -> Result<String, InvoiceError>;
}
