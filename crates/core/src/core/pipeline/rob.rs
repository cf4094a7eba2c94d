//! Reorder Buffer (ROB) and post-execution retire queue.
//!
//! The ROB is a circular buffer of handles to renamed, not-yet-retired
//! instructions in program order. It provides:
//! 1. **Allocation:** Instructions enter at the tail in rename order.
//! 2. **In-order Drain:** Only the head may leave, once its resource says it can.
//! 3. **Lookup:** Finding an in-flight instruction by sequence id (replay targets).
//!
//! A replay flush drains the ROB through the head like a normal retire.
//!
//! The retire queue holds instructions that left the ROB and wait for the
//! retire delay and the commit step. It rejects out-of-order insertion.

use std::collections::VecDeque;

use crate::common::{SeqId, SimError};
use crate::core::dinst::InstHandle;

/// A single ROB or retire queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RobEntry {
    /// Handle of the instruction.
    pub handle: InstHandle,
    /// Sequence id, cached for ordering checks without touching the pool.
    pub id: SeqId,
}

/// Reorder buffer: a circular buffer preserving program order.
#[derive(Debug)]
pub struct Rob {
    /// Fixed-size entry array.
    entries: Vec<Option<RobEntry>>,
    /// Index of the oldest entry.
    head: usize,
    /// Index where the next entry will be allocated.
    tail: usize,
    /// Number of valid entries.
    count: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Appends an instruction at the tail. Returns false if the ROB is full.
    pub fn push(&mut self, handle: InstHandle, id: SeqId) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.tail] = Some(RobEntry { handle, id });
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        true
    }

    /// Returns the head entry (oldest), if the ROB is non-empty.
    pub fn peek_head(&self) -> Option<&RobEntry> {
        if self.count == 0 {
            None
        } else {
            self.entries[self.head].as_ref()
        }
    }

    /// Removes and returns the head entry.
    pub fn pop_head(&mut self) -> Option<RobEntry> {
        if self.count == 0 {
            return None;
        }
        let entry = self.entries[self.head].take();
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        entry
    }

    /// Iterates entries from head (oldest) to tail (youngest).
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> + '_ {
        let cap = self.entries.len();
        (0..self.count).filter_map(move |i| self.entries[(self.head + i) % cap].as_ref())
    }

    /// Finds an in-flight instruction by sequence id.
    pub fn find(&self, id: SeqId) -> Option<InstHandle> {
        self.iter().find(|e| e.id == id).map(|e| e.handle)
    }
}

/// Retire queue (rROB): executed instructions waiting to commit, in order.
#[derive(Debug, Default)]
pub struct RetireQueue {
    entries: VecDeque<RobEntry>,
}

impl RetireQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an instruction that just left the ROB.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OrderViolation`] if `id` is not younger than the tail.
    pub fn push(&mut self, entry: RobEntry) -> Result<(), SimError> {
        if let Some(last) = self.entries.back()
            && last.id >= entry.id
        {
            return Err(SimError::OrderViolation {
                younger: last.id,
                older: entry.id,
            });
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// Returns the oldest entry.
    pub fn front(&self) -> Option<&RobEntry> {
        self.entries.front()
    }

    /// Removes the oldest entry.
    pub fn pop_front(&mut self) -> Option<RobEntry> {
        self.entries.pop_front()
    }

    /// Finds a queued instruction by sequence id.
    pub fn find(&self, id: SeqId) -> Option<InstHandle> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.handle)
    }

    /// Iterates entries from oldest to youngest.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> + '_ {
        self.entries.iter()
    }
}
