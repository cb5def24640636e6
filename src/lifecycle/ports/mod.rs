//! Ports for scheduled research.

mod research;

pub use research::{
    ContentResearcher, ResearchError, ResearchRunRepository, ResearchRunRepositoryError,
    ResearchRunRepositoryResult,
};
