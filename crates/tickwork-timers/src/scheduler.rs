//! Timer scheduler
//!
//! Drives two kinds of records, each in its own journal:
//! - update callbacks: at most one per target, run every tick in ascending
//!   priority order (insertion order among equal priorities)
//! - timers: keyed per target, fired according to their [`Timer`] state
//!
//! One `update(dt)` runs the update pass, then the timer pass, then every
//! function posted through a [`SchedulerRemote`] since the last tick.
//!
//! Callbacks receive the scheduler and may schedule, unschedule, pause and
//! resume anything through it while a pass runs.

use crate::error::{Error, Result};
use crate::hand_off::HandOffQueue;
use crate::record::{Retune, TickFn, TimerRecord, UpdatePatch, UpdateRecord};
use crate::{Advance, Repeat, SchedulerRemote, Timer};
use indexmap::IndexSet;
use std::fmt;
use std::ops::ControlFlow;
use std::time::Duration;
use tickwork_core::{
    AlwaysAlive, Drained, Journal, PassStats, Record, SchedulerConfig, SelectorId, TargetId,
    TargetProbe, TimerKey,
};
use tracing::{debug, debug_span, trace, warn};

/// Lowest priority; reserved for system update callbacks
pub const PRIORITY_SYSTEM: i32 = i32::MIN;

/// Lowest priority available to user update callbacks
pub const PRIORITY_NON_SYSTEM_MIN: i32 = PRIORITY_SYSTEM + 1;

/// Counters for one `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickStats {
    /// Update callback pass
    pub updates: PassStats,
    /// Timer pass
    pub timers: PassStats,
    /// Posted functions run at the end of the tick
    pub handed_off: usize,
}

/// Drives per-frame update callbacks and keyed timers
pub struct TimerScheduler {
    updates: Journal<UpdateRecord>,
    timers: Journal<TimerRecord>,
    /// Priority of the update callback being run; `PRIORITY_SYSTEM` otherwise
    update_threshold: i32,
    time_scale: f32,
    hand_off: HandOffQueue,
    probe: Box<dyn TargetProbe>,
    ticking: bool,
}

impl TimerScheduler {
    /// Create a scheduler with default settings
    pub fn new() -> Self {
        Self::with_probe(AlwaysAlive)
    }

    /// Create a scheduler with default settings that checks target liveness with `probe`
    pub fn with_probe(probe: impl TargetProbe + 'static) -> Self {
        Self::from_config(&SchedulerConfig::default(), probe)
    }

    /// Create a scheduler from configuration
    pub fn from_config(config: &SchedulerConfig, probe: impl TargetProbe + 'static) -> Self {
        Self {
            updates: Journal::new(),
            timers: Journal::new(),
            update_threshold: PRIORITY_SYSTEM,
            time_scale: config.time_scale,
            hand_off: HandOffQueue::new(config.hand_off_capacity),
            probe: Box::new(probe),
            ticking: false,
        }
    }

    /// Get a handle other threads can use to post work to this scheduler
    pub fn remote(&self) -> SchedulerRemote {
        self.hand_off.remote()
    }

    /// Get the liveness probe
    pub fn target_probe(&self) -> &dyn TargetProbe {
        self.probe.as_ref()
    }

    /// Set the factor applied to every `dt` passed to [`TimerScheduler::update`]
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
    }

    /// Get the time scale
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Schedule a keyed timer on `target`
    ///
    /// If `(target, key)` is already scheduled only its interval is updated;
    /// elapsed time, repeat count, delay and pause state are kept.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &mut self,
        callback: impl FnMut(&mut TimerScheduler, f32) + 'static,
        target: TargetId,
        interval: Duration,
        repeat: Repeat,
        delay: Duration,
        paused: bool,
        key: impl Into<TimerKey>,
    ) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::EmptyTimerKey);
        }
        self.schedule_keyed(Box::new(callback), target, interval, repeat, delay, paused, key)
    }

    /// Schedule a timer that fires every `interval` until unscheduled
    pub fn schedule_every(
        &mut self,
        callback: impl FnMut(&mut TimerScheduler, f32) + 'static,
        target: TargetId,
        interval: Duration,
        paused: bool,
        key: impl Into<TimerKey>,
    ) -> Result<()> {
        self.schedule(callback, target, interval, Repeat::Forever, Duration::ZERO, paused, key)
    }

    /// Schedule a timer that fires once after `delay`
    pub fn schedule_once(
        &mut self,
        callback: impl FnMut(&mut TimerScheduler, f32) + 'static,
        target: TargetId,
        delay: Duration,
        key: impl Into<TimerKey>,
    ) -> Result<()> {
        self.schedule(callback, target, Duration::ZERO, Repeat::ONCE, delay, false, key)
    }

    /// Schedule a timer keyed by a selector identity
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_selector(
        &mut self,
        selector: SelectorId,
        callback: impl FnMut(&mut TimerScheduler, f32) + 'static,
        target: TargetId,
        interval: Duration,
        repeat: Repeat,
        delay: Duration,
        paused: bool,
    ) -> Result<()> {
        self.schedule_keyed(
            Box::new(callback),
            target,
            interval,
            repeat,
            delay,
            paused,
            TimerKey::Selector(selector),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule_keyed(
        &mut self,
        callback: TickFn,
        target: TargetId,
        interval: Duration,
        repeat: Repeat,
        delay: Duration,
        paused: bool,
        key: TimerKey,
    ) -> Result<()> {
        let record_key = (target, key);

        if let Some(existing) = self.timers.get(&record_key) {
            if existing.paused != paused {
                warn!(
                    %target,
                    key = %record_key.1,
                    paused = existing.paused,
                    "re-scheduled timer with a different pause state; keeping the current one"
                );
            }
            debug!(
                %target,
                key = %record_key.1,
                from = ?existing.timer.interval(),
                to = ?interval,
                "timer interval updated"
            );
            self.timers.patch(&record_key, Retune { interval });
            return Ok(());
        }

        let (target, key) = record_key;
        trace!(%target, %key, ?interval, ?repeat, ?delay, "timer scheduled");
        let timer = Timer::new(interval, repeat, delay);
        self.timers
            .insert(TimerRecord::new(target, key, callback, timer, paused), true)?;
        Ok(())
    }

    /// Unschedule a keyed timer
    ///
    /// Returns false if it was not scheduled.
    pub fn unschedule(&mut self, key: impl Into<TimerKey>, target: TargetId) -> bool {
        let record_key = (target, key.into());
        if !self.timers.contains(&record_key) {
            return false;
        }
        self.timers.remove(&record_key);
        true
    }

    /// Unschedule a selector timer
    pub fn unschedule_selector(&mut self, selector: SelectorId, target: TargetId) -> bool {
        self.unschedule(selector, target)
    }

    /// Check if a keyed timer is scheduled
    pub fn is_scheduled(&self, key: impl Into<TimerKey>, target: TargetId) -> bool {
        self.timers.contains(&(target, key.into()))
    }

    /// Check if a selector timer is scheduled
    pub fn is_selector_scheduled(&self, selector: SelectorId, target: TargetId) -> bool {
        self.is_scheduled(selector, target)
    }

    /// Get the timing state of a timer
    pub fn timer(&self, key: impl Into<TimerKey>, target: TargetId) -> Option<Timer> {
        self.timers.get(&(target, key.into())).map(|record| record.timer)
    }

    // ========================================================================
    // Update callbacks
    // ========================================================================

    /// Register the per-frame callback of `target`
    ///
    /// A target has at most one update callback. Registering again with the
    /// same priority replaces the callback and pause state in place; with a
    /// different priority the callback moves to its new place in the order.
    ///
    /// Registered from inside another update callback, it runs in the same
    /// pass only if `priority` is not lower than the running callback's, and
    /// then in its priority order among the callbacks still waiting.
    pub fn schedule_update(
        &mut self,
        callback: impl FnMut(&mut TimerScheduler, f32) + 'static,
        target: TargetId,
        priority: i32,
        paused: bool,
    ) {
        let callback: TickFn = Box::new(callback);

        match self.updates.get(&target).map(|record| record.priority) {
            Some(current) if current == priority => {
                self.updates.patch(&target, UpdatePatch { callback, paused });
                return;
            }
            Some(current) => {
                trace!(%target, from = current, to = priority, "update priority changed");
                self.updates.remove(&target);
            }
            None => {}
        }

        let visit = priority >= self.update_threshold;
        let record = UpdateRecord::new(target, callback, priority, paused);
        if let Err(err) = self.updates.insert_ordered(record, visit) {
            warn!(%target, %err, "update callback not registered");
        }
    }

    /// Remove the per-frame callback of `target`
    pub fn unschedule_update(&mut self, target: TargetId) -> bool {
        if !self.updates.contains(&target) {
            return false;
        }
        self.updates.remove(&target);
        true
    }

    /// Check if `target` has a per-frame callback
    pub fn is_update_scheduled(&self, target: TargetId) -> bool {
        self.updates.contains(&target)
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    /// Unschedule every timer and update callback of `target`
    pub fn unschedule_all_for_target(&mut self, target: TargetId) {
        for key in self.timer_keys_for(target) {
            self.timers.remove(&key);
        }
        self.updates.remove(&target);
    }

    /// Unschedule everything, system callbacks included
    pub fn unschedule_all(&mut self) {
        self.unschedule_all_with_min_priority(PRIORITY_SYSTEM);
    }

    /// Unschedule every timer and every update callback with priority >= `min_priority`
    pub fn unschedule_all_with_min_priority(&mut self, min_priority: i32) {
        let timers: Vec<_> = self.timers.records().iter().map(|r| r.key()).collect();
        for key in timers {
            self.timers.remove(&key);
        }

        for target in self.update_targets(min_priority) {
            self.updates.remove(&target);
        }
    }

    /// Pause every timer and the update callback of `target`
    pub fn pause_target(&mut self, target: TargetId) {
        self.set_target_paused(target, true);
    }

    /// Resume every timer and the update callback of `target`
    pub fn resume_target(&mut self, target: TargetId) {
        self.set_target_paused(target, false);
    }

    /// Check if `target` is paused
    ///
    /// A target with timers is paused when all its timers are; otherwise the
    /// pause state of its update callback decides. Unknown targets are not
    /// paused.
    pub fn is_target_paused(&self, target: TargetId) -> bool {
        let timers = self.timers.records_for(target);
        if !timers.is_empty() {
            return timers.iter().all(|record| record.paused);
        }
        self.updates
            .get(&target)
            .is_some_and(|record| record.paused)
    }

    /// Pause every target
    ///
    /// Returns the targets touched, for [`TimerScheduler::resume_targets`].
    pub fn pause_all_targets(&mut self) -> IndexSet<TargetId> {
        self.pause_all_targets_with_min_priority(PRIORITY_SYSTEM)
    }

    /// Pause every target with timers, and every update callback with
    /// priority >= `min_priority`
    pub fn pause_all_targets_with_min_priority(&mut self, min_priority: i32) -> IndexSet<TargetId> {
        let mut paused = IndexSet::new();

        let timers: Vec<_> = self.timers.records().iter().map(|r| r.key()).collect();
        for key in timers {
            self.timers.set_paused(&key, true);
            paused.insert(key.0);
        }
        for target in self.update_targets(min_priority) {
            self.updates.set_paused(&target, true);
            paused.insert(target);
        }

        paused
    }

    /// Resume every target in `targets`
    pub fn resume_targets(&mut self, targets: impl IntoIterator<Item = TargetId>) {
        for target in targets {
            self.resume_target(target);
        }
    }

    fn set_target_paused(&mut self, target: TargetId, paused: bool) {
        for key in self.timer_keys_for(target) {
            self.timers.set_paused(&key, paused);
        }
        self.updates.set_paused(&target, paused);
    }

    fn timer_keys_for(&self, target: TargetId) -> Vec<(TargetId, TimerKey)> {
        self.timers
            .records_for(target)
            .into_iter()
            .map(|record| record.key())
            .collect()
    }

    fn update_targets(&self, min_priority: i32) -> Vec<TargetId> {
        self.updates
            .records()
            .into_iter()
            .filter(|record| record.priority >= min_priority)
            .map(|record| record.target)
            .collect()
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Run one tick of `dt` seconds
    ///
    /// Posted functions run last, after the timer pass. Hosts that also drive
    /// an action scheduler call its `update` first, so that handed-off work
    /// sees the results of every action and timer for the frame:
    ///
    /// ```rust,ignore
    /// actions.update(dt);
    /// timers.update(dt);
    /// ```
    ///
    /// Calling this from inside a callback does nothing.
    pub fn update(&mut self, dt: f32) -> TickStats {
        if self.ticking {
            warn!("update called from inside a scheduler callback; ignoring");
            return TickStats::default();
        }
        self.ticking = true;

        let dt = if (self.time_scale - 1.0).abs() >= f32::EPSILON {
            dt * self.time_scale
        } else {
            dt
        };

        let updates = self.run_updates(dt);
        let timers = self.run_timers(dt);

        let pending = self.hand_off.take();
        let handed_off = pending.len();
        for f in pending {
            f(self);
        }

        self.ticking = false;
        TickStats {
            updates,
            timers,
            handed_off,
        }
    }

    fn run_updates(&mut self, dt: f32) -> PassStats {
        if !self.updates.begin_pass() {
            return PassStats::default();
        }
        let span = debug_span!("update_pass", records = self.updates.store().len(), dt);
        let _guard = span.enter();

        while let Some(step) = self.updates.advance() {
            match step {
                Drained::Visit(target) => self.visit_update(target, dt),
                Drained::Removed(record) => trace!(target = %record.target, "update callback removed"),
            }
        }

        self.update_threshold = PRIORITY_SYSTEM;
        self.updates.stats()
    }

    fn visit_update(&mut self, target: TargetId, dt: f32) {
        let Some(record) = self.updates.store().get_by_key(&target) else {
            return;
        };
        let (priority, paused) = (record.priority, record.paused);

        if !self.probe.is_alive(target) {
            debug!(%target, "target gone; removing update callback");
            self.updates.evict(&target);
            return;
        }
        if paused {
            return;
        }

        let Some(mut callback) = self
            .updates
            .store_mut()
            .get_by_key_mut(&target)
            .and_then(|record| record.callback.take())
        else {
            return;
        };

        self.update_threshold = priority;
        callback(self, dt);

        if let Some(record) = self.updates.store_mut().get_by_key_mut(&target) {
            record.callback = Some(callback);
        }
    }

    fn run_timers(&mut self, dt: f32) -> PassStats {
        if !self.timers.begin_pass() {
            return PassStats::default();
        }
        let span = debug_span!("timer_pass", records = self.timers.store().len(), dt);
        let _guard = span.enter();

        let dt = Duration::try_from_secs_f32(dt).unwrap_or(Duration::ZERO);
        while let Some(step) = self.timers.advance() {
            match step {
                Drained::Visit(key) => self.visit_timer(key, dt),
                Drained::Removed(record) => {
                    trace!(target = %record.target, key = %record.key, "timer removed")
                }
            }
        }

        self.timers.stats()
    }

    fn visit_timer(&mut self, key: (TargetId, TimerKey), dt: Duration) {
        let Some(record) = self.timers.store().get_by_key(&key) else {
            return;
        };
        let (mut timer, paused) = (record.timer, record.paused);

        if !self.probe.is_alive(key.0) {
            debug!(target = %key.0, key = %key.1, "target gone; removing timer");
            self.timers.evict(&key);
            return;
        }
        if paused {
            return;
        }

        let Some(mut callback) = self
            .timers
            .store_mut()
            .get_by_key_mut(&key)
            .and_then(|record| record.callback.take())
        else {
            return;
        };

        let outcome = timer.advance(dt, |step| {
            callback(self, step.as_secs_f32());
            if self.timers.contains(&key) {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });

        let Some(record) = self.timers.store_mut().get_by_key_mut(&key) else {
            return;
        };
        record.timer = timer;
        record.callback = Some(callback);

        if outcome == Advance::Exhausted {
            trace!(target = %key.0, key = %key.1, "timer exhausted");
            self.timers.evict(&key);
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("updates", &self.updates)
            .field("timers", &self.timers)
            .field("time_scale", &self.time_scale)
            .finish()
    }
}
