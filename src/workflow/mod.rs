//! Workflow engine: drives a deal from outreach through negotiation to
//! settlement.
//!
//! The engine owns the operational surface (`trigger_workflow`,
//! `check_reply`, `approve_offer`, `reject_offer`) and the collaborator ports
//! it needs for mail, documents and invoicing. Each unit of work it performs
//! is tracked as a task so failures are recorded rather than swallowed.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
