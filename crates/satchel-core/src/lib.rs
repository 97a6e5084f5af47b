//! Arbitration engine and session state machine for satcheld
//!
//! This crate is the heart of satcheld, containing:
//! - Session state machine (NotStarted -> Active <-> Paused -> Completed/Failed)
//! - Signal qualification (debounce windows, disconnect grace periods)
//! - End-signal arbitration with exactly-once completion
//! - Monotonic deadline tracking across pause and resume

mod debounce;
mod engine;
mod error;
mod events;
mod grace;
mod lifecycle;
mod session;
mod sources;

pub use debounce::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use grace::*;
pub use lifecycle::*;
pub use session::*;
