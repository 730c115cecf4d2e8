//! # Riftblade Engine
//!
//! Headless runtime for the Riftblade combat core.
//!
//! This crate ties the combat library to the outside world:
//! - Config: engine settings and combat tuning from TOML
//! - Content: actor definitions from TOML and RON files
//! - Timing: fixed ticks with optional wall-clock pacing
//! - Pilot: seeded scripted input for the player
//! - Report: JSON summary of an encounter

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod config;
pub mod content_loader;
pub mod pilot;
pub mod report;
pub mod timing;
