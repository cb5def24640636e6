//! Workflow services.

mod approval;
mod context;
mod engine;
mod error;
mod guard;
mod settlement;

pub use approval::OfferApprovalService;
pub use context::{Collaborators, PipelineContext, PipelineStores};
pub use engine::{PURGED_REASON, WorkflowEngine};
pub use error::{ErrorKind, WorkflowError, WorkflowResult};
pub use guard::{InFlightDeals, InFlightPermit};
pub use settlement::{SettlementService, local_invoice_ref};
