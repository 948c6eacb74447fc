//! FIFO of compound objects whose fields have not been visited yet.

use crate::id::ObjectId;
use std::collections::VecDeque;

/// Breadth-first worklist of compound objects.
///
/// Only the mark visit of a newly marked compound object pushes here, so each
/// object is enqueued at most once per cycle.
#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<ObjectId>,
    /// Objects enqueued since the last reset.
    enqueued: usize,
}

impl Worklist {
    /// Create an empty worklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty worklist with room for `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            enqueued: 0,
        }
    }

    /// Append an object.
    #[inline]
    pub fn enqueue(&mut self, obj: ObjectId) {
        self.queue.push_back(obj);
        self.enqueued += 1;
    }

    /// Remove the oldest object.
    #[inline]
    pub fn dequeue(&mut self) -> Option<ObjectId> {
        self.queue.pop_front()
    }

    /// Check if the worklist is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of objects still pending.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Objects enqueued since the last reset.
    #[inline]
    pub fn total_enqueued(&self) -> usize {
        self.enqueued
    }

    /// Drop pending objects and reset the counter, keeping capacity.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.enqueued = 0;
    }
}
