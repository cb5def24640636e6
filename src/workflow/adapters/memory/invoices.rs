//! Accounting double keyed by idempotency key.

use crate::deal::domain::{Deal, Lead};
use crate::workflow::ports::{InvoiceError, InvoiceIssuer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Issues sequential invoice numbers, returning the same number for a
/// repeated idempotency key.
#[derive(Debug, Default)]
pub struct RecordingInvoiceIssuer {
    issued: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl RecordingInvoiceIssuer {
    /// Creates an issuer with no invoices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes issuance fail as unavailable until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns how many issue calls were made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns how many distinct invoices exist.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl InvoiceIssuer for RecordingInvoiceIssuer {
    async fn issue(
        &self,
        _deal: &Deal,
        _lead: &Lead,
        idempotency_key: &str,
    ) -> Result<String, InvoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InvoiceError::Unavailable("accounting offline".to_owned()));
        }
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let next = issued.len().saturating_add(1);
        Ok(issued
            .entry(idempotency_key.to_owned())
            .or_insert_with(|| format!("INV-{next:05}"))
            .clone())
    }
}
