//! Adapter implementations for deal-context ports.

pub mod memory;
pub mod postgres;
