//! Mail transport port.

use crate::deal::domain::{Deal, Lead};
use crate::workflow::domain::{DeliveryReceipt, InboundMessage, OutboundMessage};
use async_trait::async_trait;
use thiserror::Error;

/// Inbox access failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("mail transport failure: {0}")]
pub struct TransportError(pub String);

/// Sends mail and reads replies.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Sends `message`.
    ///
    /// Delivery failures are reported in the receipt rather than as an error,
    /// so callers decide whether a failed send is fatal.
    async fn send(&self, message: &OutboundMessage) -> DeliveryReceipt;

    /// Returns the latest reply from the deal's counterpart, if any.
    ///
    /// The same reply may be returned on successive calls; callers dedupe by
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the inbox cannot be read.
    async fn fetch_reply(
        &self,
        deal: &Deal,
        lead: &Lead,
    ) -> Result<Option<InboundMessage>, TransportError>;
}
