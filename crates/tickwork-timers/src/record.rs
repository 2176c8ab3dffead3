//! Update and timer records

use crate::{Timer, TimerScheduler};
use std::fmt;
use std::time::Duration;
use tickwork_core::{Record, TargetId, TimerKey};

/// Callback run by the timer scheduler with the elapsed seconds
pub type TickFn = Box<dyn FnMut(&mut TimerScheduler, f32)>;

/// The per-frame callback of one target
pub struct UpdateRecord {
    pub target: TargetId,
    /// `None` while the callback runs, and in dry-run copies
    pub callback: Option<TickFn>,
    pub priority: i32,
    pub paused: bool,
    pub insertion_index: u64,
}

/// Same-priority re-registration of an update callback
pub struct UpdatePatch {
    pub callback: TickFn,
    pub paused: bool,
}

impl UpdateRecord {
    pub fn new(target: TargetId, callback: TickFn, priority: i32, paused: bool) -> Self {
        Self {
            target,
            callback: Some(callback),
            priority,
            paused,
            insertion_index: 0,
        }
    }
}

impl Record for UpdateRecord {
    type Key = TargetId;
    type Order = (i32, u64);
    type Patch = UpdatePatch;

    fn key(&self) -> TargetId {
        self.target
    }

    fn target(&self) -> TargetId {
        self.target
    }

    fn order(&self) -> (i32, u64) {
        (self.priority, self.insertion_index)
    }

    fn insertion_index(&self) -> u64 {
        self.insertion_index
    }

    fn set_insertion_index(&mut self, index: u64) {
        self.insertion_index = index;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn detached(&self) -> Self {
        Self {
            target: self.target,
            callback: None,
            priority: self.priority,
            paused: self.paused,
            insertion_index: self.insertion_index,
        }
    }

    fn apply_patch(&mut self, patch: UpdatePatch) {
        self.callback = Some(patch.callback);
        self.paused = patch.paused;
    }

    fn preview_patch(&mut self, patch: &UpdatePatch) {
        self.paused = patch.paused;
    }
}

impl fmt::Debug for UpdateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRecord")
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("paused", &self.paused)
            .finish()
    }
}

/// A keyed timer bound to a target
pub struct TimerRecord {
    pub target: TargetId,
    pub key: TimerKey,
    /// `None` while the callback runs, and in dry-run copies
    pub callback: Option<TickFn>,
    pub timer: Timer,
    pub paused: bool,
    pub insertion_index: u64,
}

/// Re-scheduling an existing timer only retunes its interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retune {
    pub interval: Duration,
}

impl TimerRecord {
    pub fn new(target: TargetId, key: TimerKey, callback: TickFn, timer: Timer, paused: bool) -> Self {
        Self {
            target,
            key,
            callback: Some(callback),
            timer,
            paused,
            insertion_index: 0,
        }
    }
}

impl Record for TimerRecord {
    type Key = (TargetId, TimerKey);
    type Order = u64;
    type Patch = Retune;

    fn key(&self) -> (TargetId, TimerKey) {
        (self.target, self.key.clone())
    }

    fn target(&self) -> TargetId {
        self.target
    }

    fn order(&self) -> u64 {
        self.insertion_index
    }

    fn insertion_index(&self) -> u64 {
        self.insertion_index
    }

    fn set_insertion_index(&mut self, index: u64) {
        self.insertion_index = index;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn detached(&self) -> Self {
        Self {
            target: self.target,
            key: self.key.clone(),
            callback: None,
            timer: self.timer,
            paused: self.paused,
            insertion_index: self.insertion_index,
        }
    }

    fn apply_patch(&mut self, patch: Retune) {
        self.timer.set_interval(patch.interval);
    }

    fn preview_patch(&mut self, patch: &Retune) {
        self.timer.set_interval(patch.interval);
    }
}

impl fmt::Debug for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRecord")
            .field("target", &self.target)
            .field("key", &self.key)
            .field("timer", &self.timer)
            .field("paused", &self.paused)
            .finish()
    }
}
