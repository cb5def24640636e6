//! Step definitions for deal lifecycle scenarios.

pub mod world;

mod given;
mod then;
mod when;
