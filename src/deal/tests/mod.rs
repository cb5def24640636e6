//! Unit tests for the deal context.

mod deal_state_tests;
