//! Collaborator adapters.

pub mod memory;
