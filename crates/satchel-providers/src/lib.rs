//! Provider interfaces for satchel
//!
//! The arbitration core consumes environmental observations through the
//! traits defined here: geofence crossings, motion activity samples, and
//! accessory connect/disconnect events. Completion decisions flow out
//! through the notification dispatcher. On-device implementations live in
//! the platform layer; this crate ships mock implementations for tests and
//! the development harness.

mod mock;
mod traits;
mod types;

pub use mock::*;
pub use traits::*;
pub use types::*;
