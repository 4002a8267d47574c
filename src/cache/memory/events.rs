//! Event Log Module
//!
//! Lock-free FIFO of expiry changes. Every write that can change a key's
//! presence or expiry pushes one event; the janitor drains them.
//!
//! The queue is unbounded: producers never block and never drop an event.

use crossbeam_queue::SegQueue;

// == Event ==
/// A key whose expiry changed, with its new absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<K> {
    pub key: K,
    pub expire_at: i64,
}

// == Event Log ==
#[derive(Debug)]
pub struct EventLog<K> {
    queue: SegQueue<Event<K>>,
}

impl<K> Default for EventLog<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EventLog<K> {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    pub fn push(&self, key: K, expire_at: i64) {
        self.queue.push(Event { key, expire_at });
    }

    #[allow(dead_code)]
    pub fn pop(&self) -> Option<Event<K>> {
        self.queue.pop()
    }

    /// Pops events until the log is empty.
    ///
    /// Events pushed while draining are picked up by the same drain.
    pub fn drain(&self) -> impl Iterator<Item = Event<K>> + '_ {
        std::iter::from_fn(move || self.queue.pop())
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
