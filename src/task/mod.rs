//! Durable task queue for cross-stage work.
//!
//! Producers create tasks addressed to a target role; the consumer claims a
//! task before working on it and terminates it exactly once. Termination is
//! idempotent: completing or failing an already-terminal task changes
//! nothing. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
