//! `PostgreSQL` adapters for task queue persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskRepository, TaskPgPool};

#[cfg(test)]
pub(crate) use {
    models::TaskRow,
    repository::{row_to_task, to_row},
};
