//! The fixed set of negotiation actions.

use crate::deal::domain::OfferDraft;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified intent of a counterpart's reply, with the terms it implies.
///
/// Pricing actions carry their drafted terms, so consumers match on the
/// variant instead of checking optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NegotiationAction {
    /// Still gathering requirements; no commitment either way.
    Discovery,
    /// Interested and engaging with the offering.
    Engaged,
    /// Asked for a priced offer.
    WantsOffer {
        /// Proposed terms.
        offer: OfferDraft,
    },
    /// Accepted the standing offer.
    Accepted,
    /// Countered the standing offer.
    Counter {
        /// Revised terms.
        offer: OfferDraft,
    },
    /// Asked for a different offer altogether.
    NewOffer {
        /// Proposed terms.
        offer: OfferDraft,
    },
    /// Declined.
    Declined {
        /// Stated or inferred reason.
        #[serde(default)]
        reason: String,
    },
}

impl NegotiationAction {
    /// Returns the action's tag.
    #[must_use]
    pub const fn tag(&self) -> ActionTag {
        match self {
            Self::Discovery => ActionTag::Discovery,
            Self::Engaged => ActionTag::Engaged,
            Self::WantsOffer { .. } => ActionTag::WantsOffer,
            Self::Accepted => ActionTag::Accepted,
            Self::Counter { .. } => ActionTag::Counter,
            Self::NewOffer { .. } => ActionTag::NewOffer,
            Self::Declined { .. } => ActionTag::Declined,
        }
    }

    /// Returns the drafted terms of a pricing action.
    #[must_use]
    pub const fn offer(&self) -> Option<&OfferDraft> {
        match self {
            Self::WantsOffer { offer } | Self::Counter { offer } | Self::NewOffer { offer } => {
                Some(offer)
            }
            Self::Discovery | Self::Engaged | Self::Accepted | Self::Declined { .. } => None,
        }
    }

    /// Returns whether the action implies new pricing.
    #[must_use]
    pub const fn is_pricing(&self) -> bool {
        self.offer().is_some()
    }

    /// Returns whether the action ends the negotiation.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined { .. })
    }
}

/// Payload-free action discriminant, for logs and task output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    /// See [`NegotiationAction::Discovery`].
    Discovery,
    /// See [`NegotiationAction::Engaged`].
    Engaged,
    /// See [`NegotiationAction::WantsOffer`].
    WantsOffer,
    /// See [`NegotiationAction::Accepted`].
    Accepted,
    /// See [`NegotiationAction::Counter`].
    Counter,
    /// See [`NegotiationAction::NewOffer`].
    NewOffer,
    /// See [`NegotiationAction::Declined`].
    Declined,
}

impl ActionTag {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Engaged => "engaged",
            Self::WantsOffer => "wants_offer",
            Self::Accepted => "accepted",
            Self::Counter => "counter",
            Self::NewOffer => "new_offer",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reasoning service's answer for the negotiation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationDecision {
    /// Classified action.
    #[serde(flatten)]
    pub action: NegotiationAction,
    /// Reply subject.
    pub subject: String,
    /// Reply body.
    pub body: String,
}
