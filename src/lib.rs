//! Mercator: B2B sales-to-invoice orchestration core.
//!
//! Mercator takes a lead from first outreach through negotiation, human
//! offer approval and invoicing, and keeps deals moving on a timer when the
//! counterpart goes quiet. Every unit of work is tracked as a task with a
//! strict lifecycle so failures are recorded rather than lost.
//!
//! # Architecture
//!
//! Mercator follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, mail, etc.)
//!
//! # Modules
//!
//! - [`task`]: Task queue, task store and log buffer
//! - [`deal`]: Deals, leads, pending offers and money
//! - [`reasoning`]: Structured decisions from a reasoning service
//! - [`negotiation`]: Reply classification under deterministic guardrails
//! - [`workflow`]: The engine driving deals from outreach to settlement
//! - [`lifecycle`]: Time-driven sweeps over deals, tasks and research runs
//! - [`config`]: Thresholds and budgets
//! - [`templates`]: Built-in message texts
//! - [`clock`]: Settable clock for simulated time

pub mod clock;
pub mod config;
pub mod deal;
pub mod lifecycle;
pub mod negotiation;
pub mod reasoning;
pub mod task;
pub mod templates;
pub mod workflow;

#[cfg(test)]
mod test_support;
