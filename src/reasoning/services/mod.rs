//! Structured decoding of reasoning output.

mod structured;

pub use structured::StructuredReasoner;
