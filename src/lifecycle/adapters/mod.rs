//! Research adapters.

pub mod memory;
pub mod reasoning;
