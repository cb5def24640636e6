//! In-memory collaborators for tests and offline runs.

mod documents;
mod invoices;
mod transport;

pub use documents::StaticDocumentGenerator;
pub use invoices::RecordingInvoiceIssuer;
pub use transport::RecordingTransport;
