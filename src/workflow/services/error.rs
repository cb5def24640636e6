//! Workflow errors and their operational classification.

use crate::deal::{
    domain::{DealDomainError, DealId, DealStatus, LeadId},
    ports::DealRepositoryError,
};
use crate::negotiation::services::NegotiationError;
use crate::reasoning::ports::ReasoningError;
use crate::task::services::TaskQueueError;
use crate::templates::TemplateError;
use crate::workflow::ports::{DocumentError, InvoiceError, TransportError};
use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// How an error should be handled by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A collaborator failed; retrying later may succeed.
    Transient,
    /// The request does not fit the current state.
    Validation,
    /// The reasoning service answered outside the schema twice.
    MalformedOutput,
    /// Storage failed.
    Persistence,
}

/// Workflow engine failures.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No deal with this identifier in the organisation.
    #[error("deal {0} not found")]
    DealNotFound(DealId),
    /// No lead with this identifier in the organisation.
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),
    /// The deal has no offer awaiting approval.
    #[error("deal {0} has no pending offer")]
    NoPendingOffer(DealId),
    /// Replies are not processed in the deal's status.
    #[error("deal {deal_id} does not accept replies in status {status}")]
    NotReplyable {
        /// Deal that was checked.
        deal_id: DealId,
        /// Its current status.
        status: DealStatus,
    },
    /// Another reply for the deal is being processed.
    #[error("a reply for deal {0} is already being processed")]
    ReplyInFlight(DealId),
    /// The transport accepted the message but did not deliver it.
    #[error("message delivery failed: {0}")]
    Delivery(String),
    /// The inbox could not be read.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A document could not be rendered.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The accounting system refused or failed the invoice.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    /// Reasoning failed outside negotiation.
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
    /// The negotiation step failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    /// A deal invariant rejected the change.
    #[error(transparent)]
    Domain(#[from] DealDomainError),
    /// A message template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// The task queue failed.
    #[error(transparent)]
    Queue(#[from] TaskQueueError),
    /// Deal storage failed.
    #[error(transparent)]
    Repository(#[from] DealRepositoryError),
}

impl WorkflowError {
    /// Classifies the error for retry and reporting decisions.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DealNotFound(_)
            | Self::LeadNotFound(_)
            | Self::NoPendingOffer(_)
            | Self::NotReplyable { .. }
            | Self::ReplyInFlight(_)
            | Self::Domain(_)
            | Self::Template(_)
            | Self::Invoice(InvoiceError::Rejected(_))
            | Self::Queue(TaskQueueError::Domain(_))
            | Self::Negotiation(NegotiationError::InvalidDraft(_) | NegotiationError::Template(_)) => {
                ErrorKind::Validation
            }
            Self::Delivery(_)
            | Self::Transport(_)
            | Self::Document(_)
            | Self::Invoice(InvoiceError::Unavailable(_)) => ErrorKind::Transient,
            Self::Reasoning(err) | Self::Negotiation(NegotiationError::Reasoning(err)) => {
                reasoning_kind(err)
            }
            Self::Queue(TaskQueueError::Repository(_)) => ErrorKind::Persistence,
            Self::Repository(err) => match err {
                DealRepositoryError::Persistence(_) => ErrorKind::Persistence,
                _ => ErrorKind::Validation,
            },
        }
    }
}

const fn reasoning_kind(err: &ReasoningError) -> ErrorKind {
    match err {
        ReasoningError::Unavailable(_) => ErrorKind::Transient,
        ReasoningError::MalformedOutput { .. } => ErrorKind::MalformedOutput,
    }
}
