//! Bookkeeping for calls that are in flight.
//!
//! A call lives in up to two places: the [`CallQueue`] while the transport
//! has no window for it, and [`PendingReplies`] from the moment it is issued
//! until its reply arrives or the session closes.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use crate::error::Result;

/// FIFO of fully encoded calls waiting for transport window.
///
/// Calls leave the queue in exactly the order they entered it.
#[derive(Debug, Default)]
pub struct CallQueue {
    records: VecDeque<Vec<u8>>,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the next [`CallQueue::push_back`] cannot fail to allocate.
    pub fn reserve_one(&mut self) -> Result<()> {
        self.records.try_reserve(1)?;
        Ok(())
    }

    pub fn push_back(&mut self, record: Vec<u8>) {
        trace!("queueing {} byte call", record.len());
        self.records.push_back(record);
    }

    /// Puts a record back at the head, used when a flush could not deliver it.
    pub fn push_front(&mut self, record: Vec<u8>) {
        self.records.push_front(record);
    }

    pub fn pop_front(&mut self) -> Option<Vec<u8>> {
        self.records.pop_front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Continuations of issued calls, keyed by transaction id.
///
/// Each id is present at most once. An entry is removed exactly once: on
/// reply, on a failed send, or when the session closes.
#[derive(Debug)]
pub struct PendingReplies<C> {
    entries: HashMap<u32, C>,
}

impl<C> Default for PendingReplies<C> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<C> PendingReplies<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve_one(&mut self) -> Result<()> {
        self.entries.try_reserve(1)?;
        Ok(())
    }

    pub fn contains(&self, xid: u32) -> bool {
        self.entries.contains_key(&xid)
    }

    /// Registers `cont` under `xid`. The caller guarantees the id is unused.
    pub fn insert(&mut self, xid: u32, cont: C) {
        let previous = self.entries.insert(xid, cont);
        debug_assert!(previous.is_none(), "xid {xid} registered twice");
    }

    pub fn remove(&mut self, xid: u32) -> Option<C> {
        self.entries.remove(&xid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every continuation without invoking anything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let mut queue = CallQueue::new();
        queue.push_back(vec![1]);
        queue.push_back(vec![2]);
        assert_eq!(queue.pop_front(), Some(vec![1]));
        queue.push_front(vec![1]);
        assert_eq!(queue.pop_front(), Some(vec![1]));
        assert_eq!(queue.pop_front(), Some(vec![2]));
        assert!(queue.is_empty());
    }

    #[test]
    fn replies_are_removed_once() {
        let mut pending = PendingReplies::new();
        pending.insert(7, "lookup");
        assert!(pending.contains(7));
        assert_eq!(pending.remove(7), Some("lookup"));
        assert_eq!(pending.remove(7), None);
    }
}
