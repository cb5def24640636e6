//! Mailbox double that records outbound mail and serves scripted replies.

use crate::deal::domain::{Deal, Lead};
use crate::workflow::{
    domain::{DeliveryReceipt, InboundMessage, OutboundMessage},
    ports::{MessageTransport, TransportError},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Records every sent message and returns the newest reply per address
/// received since the deal opened.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    inbox: Mutex<HashMap<String, Vec<InboundMessage>>>,
    offline: AtomicBool,
    inbox_unavailable: AtomicBool,
}

impl RecordingTransport {
    /// Creates an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a reply from `address` in the inbox.
    pub fn deliver_reply(&self, address: &str, message: InboundMessage) {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.to_ascii_lowercase())
            .or_default()
            .push(message);
    }

    /// Makes every send fail until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes every inbox read fail until reset.
    pub fn set_inbox_unavailable(&self, unavailable: bool) {
        self.inbox_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every message sent so far, oldest first.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the messages sent to `address`, oldest first.
    #[must_use]
    pub fn sent_to(&self, address: &str) -> Vec<OutboundMessage> {
        self.sent_messages()
            .into_iter()
            .filter(|message| message.to.eq_ignore_ascii_case(address))
            .collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> DeliveryReceipt {
        if self.offline.load(Ordering::SeqCst) {
            return DeliveryReceipt::failed("transport offline");
        }
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.push(message.clone());
        DeliveryReceipt::delivered(format!("<{}@mercator.local>", sent.len()))
    }

    async fn fetch_reply(
        &self,
        deal: &Deal,
        lead: &Lead,
    ) -> Result<Option<InboundMessage>, TransportError> {
        if self.inbox_unavailable.load(Ordering::SeqCst) {
            return Err(TransportError("inbox unavailable".to_owned()));
        }
        Ok(self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&lead.email().to_ascii_lowercase())
            .and_then(|messages| {
                messages
                    .iter()
                    .rev()
                    .find(|message| message.received_at() >= deal.created_at())
                    .cloned()
            }))
    }
}
