//! Background Tasks Module
//!
//! Contains background tasks owned by store instances.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries from self-hosted tables at a
//!   fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, Sweep, SweepHandle};
