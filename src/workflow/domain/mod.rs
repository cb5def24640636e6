//! Mail and document values exchanged with collaborators.

mod message;
mod outcome;

pub use message::{Attachment, DeliveryReceipt, InboundMessage, OutboundMessage};
pub use outcome::{ApprovedOffer, OfferResolution, PurgeReport, ReplyOutcome};
