//! Core engine for the guardian safety check-in timer
//!
//! This crate is the heart of the engine, containing:
//! - The session state machine (Ready -> Active -> Paused/Expired/SosTriggered)
//! - The tick producer bound to the active session
//! - The supervisor actor that serializes all commands and ticks
//! - The escalation dispatcher that turns session events into port calls

mod clock;
mod dispatch;
mod events;
mod session;
mod supervisor;

pub use clock::*;
pub use dispatch::*;
pub use events::*;
pub use session::*;
pub use supervisor::*;
