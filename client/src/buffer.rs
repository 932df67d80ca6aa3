//! Thread-safe queue of received snapshots
//!
//! The network task pushes every decoded update as it arrives; the render loop
//! drains the whole queue once per frame. The handle is cheap to clone and all
//! clones share the same queue.

use crate::interpolation::TimestampedSnapshot;
use shared::ClientGameState;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct SnapshotBuffer {
    inner: Arc<Mutex<VecDeque<TimestampedSnapshot>>>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `state` stamped with the current time
    pub fn push(&self, state: ClientGameState) {
        self.lock().push_back(TimestampedSnapshot::new(state));
    }

    pub fn push_at(&self, state: ClientGameState, received_at: Instant) {
        self.lock()
            .push_back(TimestampedSnapshot::at(state, received_at));
    }

    /// Removes and returns every buffered snapshot, oldest first
    pub fn drain(&self) -> Vec<TimestampedSnapshot> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the queue half-modified
    fn lock(&self) -> MutexGuard<'_, VecDeque<TimestampedSnapshot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
