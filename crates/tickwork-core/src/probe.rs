//! Target liveness
//!
//! Schedulers hold targets as plain [`TargetId`]s. Before running work bound
//! to a target they ask a [`TargetProbe`] whether the target still exists;
//! records bound to a dead target are removed instead of run.

use crate::TargetId;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Answers liveness questions about targets
pub trait TargetProbe {
    /// Check if the target still exists
    fn is_alive(&self, target: TargetId) -> bool;

    /// Check if the target is currently running (attached to the active scene)
    fn is_running(&self, target: TargetId) -> bool {
        self.is_alive(target)
    }
}

/// Probe that treats every target as alive and running
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAlive;

impl TargetProbe for AlwaysAlive {
    fn is_alive(&self, _target: TargetId) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct Registry {
    /// Live targets and whether each is running
    targets: IndexMap<TargetId, bool>,
    next_id: u64,
}

/// Shared table of live targets
///
/// Clones share the same table, so the host can keep one handle to spawn and
/// despawn targets while schedulers hold another as their probe.
///
/// ```rust,ignore
/// let registry = TargetRegistry::new();
/// let mut actions = ActionScheduler::with_probe(registry.clone());
///
/// let hero = registry.spawn();
/// actions.add(Box::new(blink), hero, false);
/// registry.despawn(hero); // blink is stopped on the next update
/// ```
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    inner: Rc<RefCell<Registry>>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new live, running target
    pub fn spawn(&self) -> TargetId {
        let mut inner = self.inner.borrow_mut();
        let id = TargetId(inner.next_id);
        inner.next_id += 1;
        inner.targets.insert(id, true);
        id
    }

    /// Destroy a target
    ///
    /// Returns false if the target was not alive.
    pub fn despawn(&self, target: TargetId) -> bool {
        self.inner
            .borrow_mut()
            .targets
            .shift_remove(&target)
            .is_some()
    }

    /// Mark a live target as running or not
    ///
    /// Returns false if the target is not alive.
    pub fn set_running(&self, target: TargetId, running: bool) -> bool {
        match self.inner.borrow_mut().targets.get_mut(&target) {
            Some(state) => {
                *state = running;
                true
            }
            None => false,
        }
    }

    /// Get the number of live targets
    pub fn len(&self) -> usize {
        self.inner.borrow().targets.len()
    }

    /// Check if no target is alive
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().targets.is_empty()
    }
}

impl TargetProbe for TargetRegistry {
    fn is_alive(&self, target: TargetId) -> bool {
        self.inner.borrow().targets.contains_key(&target)
    }

    fn is_running(&self, target: TargetId) -> bool {
        self.inner
            .borrow()
            .targets
            .get(&target)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_alive() {
        assert!(AlwaysAlive.is_alive(TargetId(7)));
        assert!(AlwaysAlive.is_running(TargetId(7)));
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = TargetRegistry::new();
        let a = registry.spawn();
        let b = registry.spawn();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.is_alive(a));
        assert!(registry.despawn(a));
        assert!(!registry.is_alive(a));
        assert!(!registry.despawn(a), "second despawn is a no-op");
        assert!(registry.is_alive(b));
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = TargetRegistry::new();
        let probe: Box<dyn TargetProbe> = Box::new(registry.clone());

        let target = registry.spawn();
        assert!(probe.is_alive(target));

        registry.set_running(target, false);
        assert!(probe.is_alive(target));
        assert!(!probe.is_running(target));

        registry.despawn(target);
        assert!(!probe.is_alive(target));
        assert!(!registry.set_running(target, true));
    }
}
