//! The unit of work driven by the action scheduler

use crate::ActionScheduler;
use tickwork_core::TargetId;

/// Tag value meaning "no tag"
pub const INVALID_TAG: i32 = -1;

/// A unit of work stepped once per frame until it reports completion
///
/// The scheduler owns the action from `add` until it is removed. Removal
/// (completion, explicit removal, or the target going away) calls
/// [`Action::stop`] exactly once, then drops the action.
pub trait Action {
    /// Bind the action to its target. Called once, when the action is added.
    fn start_with_target(&mut self, _target: TargetId) {}

    /// Advance the action by `dt` seconds
    ///
    /// `scheduler` is the scheduler running this step. Any add, remove,
    /// pause or resume issued through it is applied safely, including
    /// removing this very action.
    fn step(&mut self, dt: f32, scheduler: &mut ActionScheduler);

    /// Check if the action has finished
    fn is_done(&self) -> bool;

    /// Called once when the action leaves the scheduler
    fn stop(&mut self) {}

    /// User tag for lookup and bulk removal
    fn tag(&self) -> i32 {
        INVALID_TAG
    }

    /// User bitmask for bulk removal
    fn flags(&self) -> u32 {
        0
    }
}
