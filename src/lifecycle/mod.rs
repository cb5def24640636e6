//! Lifecycle poller: time-driven sweeps over deals, tasks and research runs.
//!
//! Six sweeps advance work that no inbound event will move: stale offers get
//! follow-ups, silent early-stage deals close, lost deals reopen, won deals
//! get one satisfaction check, research runs on a schedule, and stuck tasks
//! are retried or surfaced for review. Each sweep holds its own single-flight
//! guard so a slow pass never overlaps itself.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
