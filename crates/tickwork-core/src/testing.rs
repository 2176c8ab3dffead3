//! Record type used by the store and journal tests

use crate::{Record, TargetId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Job {
    pub id: u32,
    pub target: TargetId,
    pub priority: i32,
    pub paused: bool,
    pub insertion_index: u64,
    pub label: String,
    /// Stands in for a callable payload; detached copies drop it
    pub payload: Option<u32>,
}

impl Job {
    pub fn new(id: u32, target: u64) -> Self {
        Self::with_priority(id, target, 0)
    }

    pub fn with_priority(id: u32, target: u64, priority: i32) -> Self {
        Self {
            id,
            target: TargetId(target),
            priority,
            paused: false,
            insertion_index: 0,
            label: String::new(),
            payload: Some(id),
        }
    }

    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }
}

impl Record for Job {
    type Key = u32;
    type Order = (i32, u64);
    type Patch = String;

    fn key(&self) -> u32 {
        self.id
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
            payload: None,
            ..self.clone()
        }
    }

    fn apply_patch(&mut self, patch: String) {
        self.label = patch;
    }

    fn preview_patch(&mut self, patch: &String) {
        self.label = patch.clone();
    }
}
