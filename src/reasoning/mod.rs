//! Delegated reasoning: prompts out, structured decisions back.
//!
//! The reasoning service is an external collaborator that returns free text.
//! This context owns the contract around it: prompts carry the step they
//! serve, and [`services::StructuredReasoner`] turns the text into a typed
//! decision, retrying once with a stricter instruction before giving up.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
