//! Unit tests for the reasoning context.
