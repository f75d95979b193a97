use std::collections::VecDeque;

use bytes::Bytes;

/// Bounded FIFO of recently seen short units.
///
/// Only used to flag units an operator has not seen lately. It never
/// influences whether something is emitted.
#[derive(Debug, Clone)]
pub struct NoveltyCache {
    entries: VecDeque<Bytes>,
    capacity: usize,
    max_len: usize,
}

impl NoveltyCache {
    pub fn new(capacity: usize, max_len: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            max_len,
        }
    }

    /// Record a sighting. Returns true when a short unit was not in the cache.
    ///
    /// Units longer than `max_len` are not tracked and never count as novel.
    pub fn observe(&mut self, bytes: &Bytes) -> bool {
        if self.capacity == 0 || bytes.len() > self.max_len {
            return false;
        }
        if self.entries.contains(bytes) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(bytes.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
