//! Deterministic overrides applied to every negotiation decision.

use super::NegotiationAction;
use serde::{Deserialize, Serialize};

/// Reason recorded when the round budget forces a decline.
pub const ROUNDS_EXHAUSTED_REASON: &str = "maximum negotiation rounds exhausted";

/// Round position and gates for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundLimits {
    /// Round this reply is processed as (1-based).
    pub round: u32,
    /// Round budget.
    pub max_rounds: u32,
    /// Replies required before pricing may be disclosed.
    pub min_replies_before_offer: u32,
    /// Whether the counterpart has been walked through the offering.
    pub lead_informed: bool,
}

impl RoundLimits {
    const fn pricing_unlocked(&self) -> bool {
        self.round >= self.min_replies_before_offer && self.lead_informed
    }
}

/// Which guardrail replaced the proposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guardrail {
    /// The round budget is spent; only acceptance or a decline may stand.
    RoundsExhausted,
    /// Pricing was proposed before the disclosure gate opened.
    PricingLocked,
}

/// Applies the round budget, then the pricing gate, to a proposed action.
///
/// Returns the action that stands and the guardrail that produced it, if any.
#[must_use]
pub fn apply_guardrails(
    proposed: NegotiationAction,
    limits: &RoundLimits,
) -> (NegotiationAction, Option<Guardrail>) {
    if limits.round >= limits.max_rounds && !proposed.is_final() {
        return (
            NegotiationAction::Declined {
                reason: ROUNDS_EXHAUSTED_REASON.to_owned(),
            },
            Some(Guardrail::RoundsExhausted),
        );
    }
    if proposed.is_pricing() && !limits.pricing_unlocked() {
        return (NegotiationAction::Engaged, Some(Guardrail::PricingLocked));
    }
    (proposed, None)
}
