//! Tickwork Actions - per-frame action scheduling
//!
//! An [`Action`] is a unit of work bound to a target and stepped once per
//! frame until it reports completion. The [`ActionScheduler`] owns every
//! running action:
//!
//! ```rust,ignore
//! use tickwork_actions::ActionScheduler;
//!
//! let mut actions = ActionScheduler::new();
//! let id = actions.add(Box::new(fade_out), hero, false);
//! loop {
//!     actions.update(frame_seconds);
//!     if !actions.is_scheduled(id) {
//!         break;
//!     }
//! }
//! ```
//!
//! Actions receive the scheduler in [`Action::step`] and may add, remove,
//! pause or resume any action through it, their own included.

mod action;
mod error;
mod record;
mod scheduler;

pub use action::{Action, INVALID_TAG};
pub use error::{Error, Result};
pub use record::ActionRecord;
pub use scheduler::ActionScheduler;
