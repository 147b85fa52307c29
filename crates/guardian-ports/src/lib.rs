//! External port interfaces for the guardian engine
//!
//! The engine decides *that* and *when* an escalation action fires; these
//! ports are how it reaches the collaborators that actually transmit.
//! Transport (push, SMS, phone dispatch) and persistence live behind them.

mod log;
mod mock;
mod traits;

pub use log::*;
pub use mock::*;
pub use traits::*;
