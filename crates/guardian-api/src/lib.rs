//! Shared types for the guardian safety check-in engine
//!
//! This crate defines the vocabulary shared by the engine, the port
//! implementations, and UI clients:
//! - Duration presets and the escalation policy set
//! - Session states and the read-only session view
//! - Escalation events for the audit stream
//! - The error taxonomy surfaced across the command boundary

mod error;
mod events;
mod types;

pub use error::*;
pub use events::*;
pub use types::*;
