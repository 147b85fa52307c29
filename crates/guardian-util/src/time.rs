//! Time helpers for the guardian engine
//!
//! The countdown itself is driven by the tokio interval ticker (monotonic);
//! wall-clock time is used for audit timestamps and for recomputing remaining
//! time after the process was suspended.

use chrono::{DateTime, Local};
use std::time::Duration;

/// Current local wall-clock time
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Format a duration in human-readable form for logs and views
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
