//! Tickwork Core - ordered stores and reentrancy-safe journals
//!
//! This crate provides the building blocks shared by the tickwork schedulers:
//! - Target, action and timer identities (`TargetId`, `ActionId`, `TimerKey`)
//! - The `Record` trait describing a schedulable binding of work to a target
//! - `OrderedRecordStore`, an ordered index with lookup by key and by target
//! - `Journal`, which lets callbacks mutate a store while it is being visited
//! - `TargetProbe` for target liveness
//! - `SchedulerConfig`, loadable from RON
//!
//! ## Passes
//!
//! Every scheduler tick is one pass over a journal. During a pass, writes are
//! journaled and queries read a dry-run view, so callbacks may freely add,
//! remove, pause and resume work, including their own.

mod config;
mod error;
mod identity;
pub mod journal;
mod probe;
mod record;
mod store;

#[cfg(test)]
mod testing;

pub use config::SchedulerConfig;
pub use error::{Error, Result};
pub use identity::{ActionId, SelectorId, TargetId, TimerKey};
pub use journal::{Drained, Journal, Operation, PassState, PassStats};
pub use probe::{AlwaysAlive, TargetProbe, TargetRegistry};
pub use record::Record;
pub use store::OrderedRecordStore;
