//! Unit tests for the negotiation context.
