//! Outbound and inbound mail.

use crate::deal::domain::ThreadRefs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub content: Vec<u8>,
}

impl Attachment {
    /// Creates a PDF attachment.
    #[must_use]
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_owned(),
            content,
        }
    }
}

/// Message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Threading references when replying.
    pub thread: Option<ThreadRefs>,
    /// Attached files.
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// Creates a message without threading or attachments.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            thread: None,
            attachments: Vec::new(),
        }
    }

    /// Threads the message as a reply.
    #[must_use]
    pub fn in_thread(mut self, thread: ThreadRefs) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Transport's account of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Whether the message left the system.
    pub sent: bool,
    /// Transport message identifier.
    pub message_id: Option<String>,
    /// Failure description.
    pub error: Option<String>,
}

impl DeliveryReceipt {
    /// A successful delivery.
    #[must_use]
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            sent: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// A failed delivery.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            sent: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Reply received from a counterpart.
///
/// The fingerprint identifies the reply across fetches: the SHA-256 of the
/// transport message id when there is one, otherwise of sender, subject and
/// body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    message_id: Option<String>,
    from: String,
    subject: String,
    body: String,
    received_at: DateTime<Utc>,
    fingerprint: String,
}

impl InboundMessage {
    /// Creates an inbound message and computes its fingerprint.
    #[must_use]
    pub fn new(
        message_id: Option<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        let from_address = from.into();
        let subject_line = subject.into();
        let text = body.into();
        let mut hasher = Sha256::new();
        match &message_id {
            Some(id) => hasher.update(id.as_bytes()),
            None => {
                for part in [&from_address, &subject_line, &text] {
                    hasher.update(part.as_bytes());
                    hasher.update([0_u8]);
                }
            }
        }
        let fingerprint = hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        Self {
            message_id,
            from: from_address,
            subject: subject_line,
            body: text,
            received_at,
            fingerprint,
        }
    }

    /// Returns the transport message id.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Returns the sender.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns when the message arrived.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns the hex-encoded fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Returns threading references for a reply to this message.
    #[must_use]
    pub fn reply_thread(&self) -> ThreadRefs {
        self.message_id
            .as_deref()
            .map_or_else(ThreadRefs::default, ThreadRefs::replying_to)
    }

    /// Returns a reply subject, prefixing `Re:` once.
    #[must_use]
    pub fn reply_subject(&self) -> String {
        if self.subject.to_ascii_lowercase().starts_with("re:") {
            self.subject.clone()
        } else {
            format!("Re: {}", self.subject)
        }
    }
}
