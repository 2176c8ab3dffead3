//! Action records

use crate::Action;
use std::convert::Infallible;
use std::fmt;
use tickwork_core::{ActionId, Record, TargetId};

/// Binding of one action to its target
pub struct ActionRecord {
    pub id: ActionId,
    pub target: TargetId,
    /// `None` while the action is being stepped, and in dry-run copies
    pub action: Option<Box<dyn Action>>,
    /// Captured from the action on add
    pub tag: i32,
    /// Captured from the action on add
    pub flags: u32,
    pub paused: bool,
    pub insertion_index: u64,
}

impl ActionRecord {
    /// Create a record for a freshly added action
    pub fn new(id: ActionId, target: TargetId, action: Box<dyn Action>, paused: bool) -> Self {
        Self {
            id,
            target,
            tag: action.tag(),
            flags: action.flags(),
            action: Some(action),
            paused,
            insertion_index: 0,
        }
    }

    /// Stop the action and drop the record
    pub(crate) fn retire(mut self) {
        if let Some(mut action) = self.action.take() {
            action.stop();
        }
    }
}

impl Record for ActionRecord {
    type Key = ActionId;
    type Order = u64;
    type Patch = Infallible;

    fn key(&self) -> ActionId {
        self.id
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
            id: self.id,
            target: self.target,
            action: None,
            tag: self.tag,
            flags: self.flags,
            paused: self.paused,
            insertion_index: self.insertion_index,
        }
    }

    fn apply_patch(&mut self, patch: Infallible) {
        match patch {}
    }

    fn preview_patch(&mut self, patch: &Infallible) {
        match *patch {}
    }
}

impl fmt::Debug for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRecord")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("tag", &self.tag)
            .field("flags", &self.flags)
            .field("paused", &self.paused)
            .field("attached", &self.action.is_some())
            .finish()
    }
}
