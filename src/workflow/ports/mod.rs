//! Collaborator contracts the workflow engine depends on.

mod documents;
mod invoices;
mod transport;

pub use documents::{DocumentError, DocumentGenerator, DocumentTemplate};
pub use invoices::{InvoiceError, InvoiceIssuer};
pub use transport::{MessageTransport, TransportError};
