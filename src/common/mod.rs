//! Shared plumbing used across the scanners: process execution, the clock
//! abstraction and cooperative cancellation.

pub mod cancel;
pub mod clock;
pub mod command_utils;

pub use cancel::CancellationToken;
pub use clock::{Clock, FixedClock, SystemClock};
