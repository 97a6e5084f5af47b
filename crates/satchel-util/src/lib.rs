//! Shared vocabulary for satchel
//!
//! This crate provides:
//! - ID types (SessionId, RegionId, PeripheralId)
//! - Time utilities (monotonic time, duration helpers)
//! - Signal kinds (what can end a session)

mod ids;
mod signal;
mod time;

pub use ids::*;
pub use signal::*;
pub use time::*;
