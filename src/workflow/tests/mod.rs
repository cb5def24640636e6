//! Unit tests for the workflow context.

mod error_tests;
