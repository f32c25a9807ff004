//! Snapshot orchestration: disable automatic saves fleet-wide, then walk the
//! fleet one endpoint at a time, triggering a background save and waiting for
//! it to finish before moving on.

pub mod scheduler;
pub mod toggle;
pub mod waiter;

pub use scheduler::{FleetScheduler, Phase};
pub use toggle::disable_persistence;
pub use waiter::save_blocking;
