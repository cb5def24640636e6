//! Negotiation step: classify an inbound reply and draft the response.
//!
//! The reasoning service proposes an action; the guardrails in
//! [`domain::apply_guardrails`] then enforce the round budget and the
//! pricing-disclosure gate before the workflow engine acts on it.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
