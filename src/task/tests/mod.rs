//! Unit tests for the task queue context.
