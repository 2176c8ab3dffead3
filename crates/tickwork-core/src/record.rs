//! Record trait shared by every scheduler store
//!
//! A record binds a unit of work (an action, a per-frame callback, a timer)
//! to a target, together with its scheduling metadata. Stores and journals
//! are generic over this trait so the action and timer schedulers can share
//! one implementation of ordering, indexing and reentrancy handling.
//!
//! # Example
//!
//! ```rust,ignore
//! use tickwork_core::{Record, TargetId};
//! use std::convert::Infallible;
//!
//! struct Blink {
//!     id: u32,
//!     target: TargetId,
//!     paused: bool,
//!     insertion_index: u64,
//! }
//!
//! impl Record for Blink {
//!     type Key = u32;
//!     type Order = u64;
//!     type Patch = Infallible;
//!
//!     fn key(&self) -> u32 { self.id }
//!     fn target(&self) -> TargetId { self.target }
//!     fn order(&self) -> u64 { self.insertion_index }
//!     // ... other methods
//! }
//! ```

use crate::TargetId;
use std::fmt;
use std::hash::Hash;

/// A schedulable binding of work to a target.
///
/// `order()` must be derived from data that never changes while the record
/// is stored (its priority and its insertion index), because the store
/// indexes records by it.
pub trait Record {
    /// Unique identity of the record within one store
    type Key: Clone + Eq + Hash + fmt::Debug;

    /// Sort key; insertion index is the tie-break
    type Order: Copy + Ord + fmt::Debug;

    /// In-place modification applied through the journal
    type Patch;

    /// Get the unique key of this record
    fn key(&self) -> Self::Key;

    /// Get the target this record is bound to
    fn target(&self) -> TargetId;

    /// Get the sort key of this record
    fn order(&self) -> Self::Order;

    /// Get the insertion index assigned by the owning store
    fn insertion_index(&self) -> u64;

    /// Assign the insertion index. Only stores call this.
    fn set_insertion_index(&mut self, index: u64);

    /// Check if the record is paused
    fn is_paused(&self) -> bool;

    /// Set the pause flag
    fn set_paused(&mut self, paused: bool);

    /// Copy the scheduling metadata without the payload.
    ///
    /// Detached copies populate the dry-run view while a pass is running, so
    /// they must answer every query the scheduler exposes (target, key,
    /// pause flag, priority, tags) but never carry the callable payload.
    fn detached(&self) -> Self;

    /// Apply a patch to the authoritative record.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Mirror the metadata effect of a patch onto a detached copy.
    fn preview_patch(&mut self, patch: &Self::Patch);
}
