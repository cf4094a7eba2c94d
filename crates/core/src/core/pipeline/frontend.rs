//! Front-end queues and fetch gating.
//!
//! Fetched bundles travel through a fixed-delay decode pipe and then into a
//! bounded instruction queue that rename drains. This module provides:
//! 1. **Decode Pipe:** Bundles become visible to the queue `decode_delay` cycles after fetch.
//! 2. **Instruction Queue:** A bundle moves only when it fits entirely.
//! 3. **Fetch Gating:** Blocking behind a mispredicted branch and predictor bubbles.

use std::collections::VecDeque;

use crate::common::Cycle;
use crate::config::PipelineConfig;
use crate::core::dinst::InstHandle;

#[derive(Debug)]
struct Bundle {
    ready_at: Cycle,
    insts: Vec<InstHandle>,
}

/// Decode pipe, instruction queue and fetch-gating state of one thread.
#[derive(Debug)]
pub struct FrontEnd {
    decode_delay: Cycle,
    queue_size: usize,
    pipe: VecDeque<Bundle>,
    queue: VecDeque<InstHandle>,
    blocked_on: Option<InstHandle>,
    bubble_until: Cycle,
}

impl FrontEnd {
    /// Creates an empty front-end.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            decode_delay: config.decode_delay,
            queue_size: config.inst_queue_size,
            pipe: VecDeque::with_capacity(config.decode_delay as usize + 1),
            queue: VecDeque::with_capacity(config.inst_queue_size),
            blocked_on: None,
            bubble_until: 0,
        }
    }

    /// Whether fetch may run this cycle.
    ///
    /// The decode pipe accepts at most one bundle per cycle of delay.
    pub fn can_fetch(&self, now: Cycle) -> bool {
        self.blocked_on.is_none() && now >= self.bubble_until && self.pipe.len() as u64 <= self.decode_delay
    }

    /// Stops fetch until `branch` executes.
    pub fn block_on(&mut self, branch: InstHandle) {
        self.blocked_on = Some(branch);
    }

    /// Reopens fetch if it was blocked on `h`. Returns true if it was.
    pub fn unblock_if(&mut self, h: InstHandle) -> bool {
        if self.blocked_on == Some(h) {
            self.blocked_on = None;
            true
        } else {
            false
        }
    }

    /// Branch fetch is waiting on, if any.
    pub const fn blocked_on(&self) -> Option<InstHandle> {
        self.blocked_on
    }

    /// Suppresses fetch until `cycle`.
    pub fn bubble_until(&mut self, cycle: Cycle) {
        self.bubble_until = self.bubble_until.max(cycle);
    }

    /// Enters a fetched bundle into the decode pipe.
    pub fn push_bundle(&mut self, now: Cycle, insts: Vec<InstHandle>) {
        if !insts.is_empty() {
            self.pipe.push_back(Bundle {
                ready_at: now + self.decode_delay,
                insts,
            });
        }
    }

    /// Moves decoded bundles into the instruction queue while they fit.
    ///
    /// Returns the number of instructions moved.
    pub fn advance(&mut self, now: Cycle) -> usize {
        let mut moved = 0;
        while let Some(b) = self.pipe.front() {
            if b.ready_at > now || self.queue.len() + b.insts.len() > self.queue_size {
                break;
            }
            if let Some(b) = self.pipe.pop_front() {
                moved += b.insts.len();
                self.queue.extend(b.insts);
            }
        }
        moved
    }

    /// Oldest instruction waiting for rename.
    pub fn peek(&self) -> Option<InstHandle> {
        self.queue.front().copied()
    }

    /// Removes the oldest queued instruction.
    pub fn pop(&mut self) -> Option<InstHandle> {
        self.queue.pop_front()
    }

    /// Instructions in the instruction queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Instructions anywhere in the front-end.
    pub fn in_flight(&self) -> usize {
        self.queue.len() + self.pipe.iter().map(|b| b.insts.len()).sum::<usize>()
    }

    /// Returns true if nothing is in the front-end.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.pipe.is_empty()
    }

    /// Empties every queue and clears fetch gating.
    ///
    /// Returns the discarded instructions, oldest first.
    pub fn drain(&mut self) -> Vec<InstHandle> {
        let mut out: Vec<InstHandle> = self.queue.drain(..).collect();
        // The pipe holds younger instructions than the queue.
        for b in self.pipe.drain(..) {
            out.extend(b.insts);
        }
        self.blocked_on = None;
        self.bubble_until = 0;
        out
    }
}
