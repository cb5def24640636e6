//! Deals, leads and pending offers.
//!
//! A deal's status is the pipeline state machine
//! (`contacted -> in_pipeline -> offer_sent -> closed_won | closed_lost`, with
//! lost deals later marked `reopened`). Leads carry the counterpart profile the
//! negotiation guardrails read. Pending offers hold priced drafts until a
//! reviewer approves or rejects them. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
