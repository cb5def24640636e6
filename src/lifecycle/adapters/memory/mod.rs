//! In-memory research adapters.

mod research;

pub use research::{CannedResearcher, InMemoryResearchRunRepository};
