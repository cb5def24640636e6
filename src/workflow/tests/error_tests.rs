//! Operational classification of workflow errors.

use crate::deal::{
    domain::{DealDomainError, DealId, DealStatus},
    ports::DealRepositoryError,
};
use crate::negotiation::services::NegotiationError;
use crate::reasoning::{domain::ReasoningStep, ports::ReasoningError};
use crate::workflow::{
    ports::{DocumentError, InvoiceError, TransportError},
    services::{ErrorKind, WorkflowError},
};
use rstest::rstest;

fn malformed() -> ReasoningError {
    ReasoningError::MalformedOutput {
        step: ReasoningStep::Negotiation,
        detail: "expected value".to_owned(),
    }
}

#[rstest]
#[case(WorkflowError::DealNotFound(DealId::new()), ErrorKind::Validation)]
#[case(WorkflowError::ReplyInFlight(DealId::new()), ErrorKind::Validation)]
#[case(
    WorkflowError::NotReplyable { deal_id: DealId::new(), status: DealStatus::ClosedWon },
    ErrorKind::Validation
)]
#[case(WorkflowError::Domain(DealDomainError::InvalidQuantity), ErrorKind::Validation)]
#[case(WorkflowError::Delivery("bounced".to_owned()), ErrorKind::Transient)]
#[case(WorkflowError::Transport(TransportError("imap down".to_owned())), ErrorKind::Transient)]
#[case(WorkflowError::Document(DocumentError("no fonts".to_owned())), ErrorKind::Transient)]
#[case(
    WorkflowError::Invoice(InvoiceError::Unavailable("timeout".to_owned())),
    ErrorKind::Transient
)]
#[case(
    WorkflowError::Invoice(InvoiceError::Rejected("bad vat id".to_owned())),
    ErrorKind::Validation
)]
#[case(
    WorkflowError::Reasoning(ReasoningError::Unavailable("rate limited".to_owned())),
    ErrorKind::Transient
)]
#[case(WorkflowError::Negotiation(NegotiationError::Reasoning(malformed())), ErrorKind::MalformedOutput)]
#[case(
    WorkflowError::Negotiation(NegotiationError::InvalidDraft(DealDomainError::EmptyProduct)),
    ErrorKind::Validation
)]
#[case(
    WorkflowError::Repository(DealRepositoryError::persistence(std::io::Error::other("disk"))),
    ErrorKind::Persistence
)]
#[case(
    WorkflowError::Repository(DealRepositoryError::DealNotFound(DealId::new())),
    ErrorKind::Validation
)]
fn errors_are_classified(#[case] error: WorkflowError, #[case] expected: ErrorKind) {
    assert_eq!(error.kind(), expected);
}
