//! Reasoning service adapters.

pub mod memory;
