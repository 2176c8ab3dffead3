//! Thread hand-off queue
//!
//! Other threads post functions through a [`SchedulerRemote`]; the timer
//! scheduler runs them on its own thread at the end of the next `update`,
//! after both passes.

use crate::error::{Error, Result};
use crate::TimerScheduler;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A function waiting to run on the scheduler thread
pub type HandOff = Box<dyn FnOnce(&mut TimerScheduler) + Send>;

type Queue = Arc<Mutex<Vec<HandOff>>>;

/// Scheduler side of the queue
pub(crate) struct HandOffQueue {
    queue: Queue,
    capacity: usize,
}

impl HandOffQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    pub fn remote(&self) -> SchedulerRemote {
        SchedulerRemote {
            queue: Arc::clone(&self.queue),
            capacity: self.capacity,
        }
    }

    /// Take every pending function, leaving the queue empty
    pub fn take(&self) -> Vec<HandOff> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// Cloneable, thread-safe handle for posting work to a timer scheduler
#[derive(Clone)]
pub struct SchedulerRemote {
    queue: Queue,
    capacity: usize,
}

impl SchedulerRemote {
    /// Queue `f` to run on the scheduler thread during the next update
    ///
    /// Fails when `capacity` functions are already waiting (0 = unlimited).
    pub fn post(&self, f: impl FnOnce(&mut TimerScheduler) + Send + 'static) -> Result<()> {
        let mut queue = self.queue.lock();
        if self.capacity > 0 && queue.len() >= self.capacity {
            return Err(Error::HandOffFull {
                capacity: self.capacity,
            });
        }
        queue.push(Box::new(f));
        Ok(())
    }

    /// Get the number of functions waiting
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl fmt::Debug for SchedulerRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerRemote")
            .field("pending", &self.pending())
            .field("capacity", &self.capacity)
            .finish()
    }
}
