//! Action scheduler
//!
//! Owns every running action and steps each one once per `update`, in the
//! order the actions were added. Actions may add, remove, pause and resume
//! actions (their own included) from inside `step`; those requests go
//! through the journal and take effect in request order within the same
//! pass.

use crate::error::{Error, Result};
use crate::{Action, ActionRecord, INVALID_TAG};
use indexmap::IndexSet;
use std::fmt;
use tickwork_core::{
    ActionId, AlwaysAlive, Drained, Journal, PassStats, Record, TargetId, TargetProbe,
};
use tracing::{debug, debug_span, trace, warn};

/// Drives actions bound to targets
pub struct ActionScheduler {
    journal: Journal<ActionRecord>,
    probe: Box<dyn TargetProbe>,
    next_id: u64,
}

impl ActionScheduler {
    /// Create a scheduler that treats every target as alive
    pub fn new() -> Self {
        Self::with_probe(AlwaysAlive)
    }

    /// Create a scheduler that checks target liveness with `probe`
    pub fn with_probe(probe: impl TargetProbe + 'static) -> Self {
        Self {
            journal: Journal::new(),
            probe: Box::new(probe),
            next_id: 0,
        }
    }

    /// Get the liveness probe, for actions that need to ask about targets
    pub fn target_probe(&self) -> &dyn TargetProbe {
        self.probe.as_ref()
    }

    // ========================================================================
    // Adding
    // ========================================================================

    /// Add an action bound to `target`
    ///
    /// The action is bound with [`Action::start_with_target`] right away.
    /// Added mid-pass, it is stepped later in the same pass.
    pub fn add(&mut self, mut action: Box<dyn Action>, target: TargetId, paused: bool) -> ActionId {
        let id = ActionId(self.next_id);
        self.next_id += 1;

        action.start_with_target(target);
        trace!(%id, %target, paused, "action added");

        let record = ActionRecord::new(id, target, action, paused);
        if let Err(err) = self.journal.insert(record, true) {
            warn!(%id, %err, "action id collision");
        }
        id
    }

    // ========================================================================
    // Removing
    // ========================================================================

    /// Remove one action
    ///
    /// Returns false if the action is not scheduled.
    pub fn remove(&mut self, id: ActionId) -> bool {
        if !self.journal.contains(&id) {
            return false;
        }
        if let Some(record) = self.journal.remove(&id) {
            record.retire();
        }
        true
    }

    /// Remove every action
    pub fn remove_all(&mut self) {
        let ids: Vec<ActionId> = self.journal.records().iter().map(|r| r.id).collect();
        self.remove_ids(ids);
    }

    /// Remove every action bound to `target`
    pub fn remove_all_for_target(&mut self, target: TargetId) {
        let ids = self.ids_for(target, |_| true);
        self.remove_ids(ids);
    }

    /// Remove the first action on `target` carrying `tag`
    pub fn remove_by_tag(&mut self, tag: i32, target: TargetId) -> Result<()> {
        check_tag(tag)?;
        if let Some(id) = self.ids_for(target, |r| r.tag == tag).into_iter().next() {
            self.remove(id);
        }
        Ok(())
    }

    /// Remove every action on `target` carrying `tag`
    pub fn remove_all_by_tag(&mut self, tag: i32, target: TargetId) -> Result<()> {
        check_tag(tag)?;
        let ids = self.ids_for(target, |r| r.tag == tag);
        self.remove_ids(ids);
        Ok(())
    }

    /// Remove every action on `target` whose flags contain all bits of `flags`
    pub fn remove_all_by_flags(&mut self, flags: u32, target: TargetId) -> Result<()> {
        if flags == 0 {
            return Err(Error::EmptyFlags);
        }
        let ids = self.ids_for(target, |r| r.flags & flags == flags);
        self.remove_ids(ids);
        Ok(())
    }

    fn remove_ids(&mut self, ids: Vec<ActionId>) {
        for id in ids {
            self.remove(id);
        }
    }

    fn ids_for(&self, target: TargetId, matches: impl Fn(&ActionRecord) -> bool) -> Vec<ActionId> {
        self.journal
            .records_for(target)
            .into_iter()
            .filter(|record| matches(record))
            .map(|record| record.id)
            .collect()
    }

    // ========================================================================
    // Pausing
    // ========================================================================

    /// Pause every action bound to `target`
    pub fn pause_target(&mut self, target: TargetId) {
        self.set_target_paused(target, true);
    }

    /// Resume every action bound to `target`
    pub fn resume_target(&mut self, target: TargetId) {
        self.set_target_paused(target, false);
    }

    /// Pause every running action
    ///
    /// Returns the targets that had at least one running action, so they can
    /// be handed back to [`ActionScheduler::resume_targets`].
    pub fn pause_all_targets(&mut self) -> Vec<TargetId> {
        let running: IndexSet<TargetId> = self
            .journal
            .records()
            .into_iter()
            .filter(|record| !record.paused)
            .map(|record| record.target)
            .collect();

        for &target in &running {
            self.pause_target(target);
        }
        running.into_iter().collect()
    }

    /// Resume every action bound to any of `targets`
    pub fn resume_targets(&mut self, targets: &[TargetId]) {
        for &target in targets {
            self.resume_target(target);
        }
    }

    fn set_target_paused(&mut self, target: TargetId, paused: bool) {
        for id in self.ids_for(target, |r| r.paused != paused) {
            self.journal.set_paused(&id, paused);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get the first action on `target` carrying `tag`
    pub fn action_by_tag(&self, tag: i32, target: TargetId) -> Option<ActionId> {
        if tag == INVALID_TAG {
            warn!(%target, "action_by_tag called with the invalid tag");
            return None;
        }
        self.ids_for(target, |r| r.tag == tag).into_iter().next()
    }

    /// Get the actions bound to `target`, in step order
    pub fn running_actions_for_target(&self, target: TargetId) -> Vec<ActionId> {
        self.ids_for(target, |_| true)
    }

    /// Count the actions bound to `target`, paused ones included
    pub fn number_of_running_actions_for_target(&self, target: TargetId) -> usize {
        self.journal.count_for_target(target)
    }

    /// Count the actions on `target` carrying `tag`
    pub fn number_of_running_actions_by_tag(&self, tag: i32, target: TargetId) -> usize {
        if tag == INVALID_TAG {
            warn!(%target, "number_of_running_actions_by_tag called with the invalid tag");
            return 0;
        }
        self.ids_for(target, |r| r.tag == tag).len()
    }

    /// Count all scheduled actions
    pub fn number_of_running_actions(&self) -> usize {
        self.journal.len()
    }

    /// Get every target with at least one action
    pub fn all_targets(&self) -> Vec<TargetId> {
        self.journal.targets()
    }

    /// Check if an action is scheduled
    pub fn is_scheduled(&self, id: ActionId) -> bool {
        self.journal.contains(&id)
    }

    /// Check if an action is paused
    pub fn is_paused(&self, id: ActionId) -> Option<bool> {
        self.journal.get(&id).map(|record| record.paused)
    }

    /// Get an action
    ///
    /// Returns `None` for an action that is being stepped, or one that was
    /// added during the current pass and not applied yet.
    pub fn action(&self, id: ActionId) -> Option<&dyn Action> {
        self.journal
            .store()
            .get_by_key(&id)
            .and_then(|record| record.action.as_deref())
    }

    /// Get an action mutably, see [`ActionScheduler::action`]
    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut (dyn Action + 'static)> {
        self.journal
            .store_mut()
            .get_by_key_mut(&id)
            .and_then(|record| record.action.as_deref_mut())
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Step every running action by `dt` seconds
    ///
    /// Calling this from inside an action's `step` does nothing.
    pub fn update(&mut self, dt: f32) -> PassStats {
        if !self.journal.begin_pass() {
            return PassStats::default();
        }

        let span = debug_span!("action_pass", records = self.journal.store().len(), dt);
        let _guard = span.enter();

        while let Some(step) = self.journal.advance() {
            match step {
                Drained::Visit(id) => self.visit(id, dt),
                Drained::Removed(record) => record.retire(),
            }
        }

        let stats = self.journal.stats();
        debug!(visits = stats.visits, removed = stats.removed, "action pass done");
        stats
    }

    fn visit(&mut self, id: ActionId, dt: f32) {
        let Some(record) = self.journal.store().get_by_key(&id) else {
            return;
        };
        let (target, paused) = (record.target(), record.is_paused());

        if !self.probe.is_alive(target) {
            debug!(%id, %target, "target gone; removing action");
            if let Some(record) = self.journal.evict(&id) {
                record.retire();
            }
            return;
        }
        if paused {
            return;
        }

        let Some(mut action) = self
            .journal
            .store_mut()
            .get_by_key_mut(&id)
            .and_then(|record| record.action.take())
        else {
            return;
        };

        action.step(dt, self);
        let done = action.is_done();

        match self.journal.store_mut().get_by_key_mut(&id) {
            Some(record) => record.action = Some(action),
            None => {
                action.stop();
                return;
            }
        }

        if done {
            trace!(%id, "action done");
            if let Some(record) = self.journal.evict(&id) {
                record.retire();
            }
        }
    }
}

fn check_tag(tag: i32) -> Result<()> {
    if tag == INVALID_TAG {
        return Err(Error::InvalidTag(tag));
    }
    Ok(())
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActionScheduler {
    fn drop(&mut self) {
        for record in self.journal.clear() {
            record.retire();
        }
    }
}

impl fmt::Debug for ActionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionScheduler")
            .field("journal", &self.journal)
            .field("next_id", &self.next_id)
            .finish()
    }
}
