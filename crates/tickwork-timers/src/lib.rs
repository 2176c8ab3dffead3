//! Tickwork Timers - per-frame update callbacks and keyed timers
//!
//! This crate provides:
//! - [`TimerScheduler`]: runs one update callback per target every tick, in
//!   priority order, and fires keyed timers on their interval
//! - [`Timer`]: the timing state machine behind every timer
//! - [`SchedulerRemote`]: a thread-safe handle for running work on the
//!   scheduler's thread at the end of the next tick
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tickwork_timers::TimerScheduler;
//!
//! let mut timers = TimerScheduler::new();
//! timers.schedule_update(|_, dt| hero_update(dt), hero, 0, false);
//! timers.schedule_every(|_, _| spawn_wave(), level, Duration::from_secs(5), false, "waves")?;
//!
//! loop {
//!     actions.update(frame_seconds);
//!     timers.update(frame_seconds);
//! }
//! ```
//!
//! Functions posted through a [`SchedulerRemote`] run at the end of
//! `TimerScheduler::update`. Drive any action scheduler before it so that they
//! run after every action and timer of the frame.

mod error;
mod hand_off;
mod record;
mod scheduler;
mod timer;

pub use error::{Error, Result};
pub use hand_off::{HandOff, SchedulerRemote};
pub use record::{Retune, TickFn, TimerRecord, UpdatePatch, UpdateRecord};
pub use scheduler::{TickStats, TimerScheduler, PRIORITY_NON_SYSTEM_MIN, PRIORITY_SYSTEM};
pub use timer::{Advance, Repeat, Timer};
