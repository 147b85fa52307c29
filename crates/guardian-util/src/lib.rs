//! Shared utilities for the guardian engine
//!
//! This crate provides:
//! - ID types (SessionId)
//! - Time helpers (wall-clock now, duration formatting)

mod ids;
mod time;

pub use ids::*;
pub use time::*;
