//! Identity types for targets, actions and timers
//!
//! All identities are plain values. A scheduler never owns the thing an
//! identity names; it only compares identities for equality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a scheduling target (a node, entity, or any host object)
///
/// The scheduler holds targets as non-owning handles. Whether a target is
/// still alive is answered by a [`TargetProbe`](crate::TargetProbe), never
/// inferred from the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl TargetId {
    /// Create a new target ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target:{}", self.0)
    }
}

/// Identity of an action instance, assigned by the action scheduler on add
///
/// IDs are never reused by the scheduler that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl ActionId {
    /// Create a new action ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action:{}", self.0)
    }
}

/// Identity of a legacy selector-style timer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectorId(pub u64);

impl fmt::Display for SelectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "selector:{}", self.0)
    }
}

/// Key of a timer, unique per target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKey {
    /// A user-chosen name
    Name(String),
    /// A legacy selector identity
    Selector(SelectorId),
}

impl TimerKey {
    /// Create a named key
    pub fn name(name: impl Into<String>) -> Self {
        TimerKey::Name(name.into())
    }

    /// Check if this is a named key with an empty name
    pub fn is_empty(&self) -> bool {
        matches!(self, TimerKey::Name(name) if name.is_empty())
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKey::Name(name) => write!(f, "{}", name),
            TimerKey::Selector(selector) => write!(f, "{}", selector),
        }
    }
}

impl From<&str> for TimerKey {
    fn from(s: &str) -> Self {
        TimerKey::Name(s.to_string())
    }
}

impl From<String> for TimerKey {
    fn from(s: String) -> Self {
        TimerKey::Name(s)
    }
}

impl From<SelectorId> for TimerKey {
    fn from(selector: SelectorId) -> Self {
        TimerKey::Selector(selector)
    }
}
