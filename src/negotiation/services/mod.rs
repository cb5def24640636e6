//! Negotiation step service.

mod step;

pub use step::{NegotiationError, NegotiationInput, NegotiationOutcome, NegotiationStep};
