//! Return Address Stack (RAS).
//!
//! The RAS predicts function return addresses. It is a circular stack: a
//! call pushes the fall-through address, overwriting the oldest entry when
//! full, and a return compares the top against the real target and pops it.

use super::{BranchInfo, BranchKind, PredType};

/// Return Address Stack structure.
#[derive(Clone, Debug)]
pub struct Ras {
    /// The stack storage.
    stack: Vec<u64>,
    /// Slot of the most recent push.
    top: usize,
    /// Valid entries, at most the capacity.
    depth: usize,
}

impl Ras {
    /// Creates a Return Address Stack with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            stack: vec![0; capacity.max(1)],
            top: 0,
            depth: 0,
        }
    }

    /// Pushes a return address, overwriting the oldest entry when full.
    pub fn push(&mut self, addr: u64) {
        self.top = (self.top + 1) % self.stack.len();
        self.stack[self.top] = addr;
        self.depth = (self.depth + 1).min(self.stack.len());
    }

    /// Pops a return address, or `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<u64> {
        let addr = self.peek()?;
        self.top = (self.top + self.stack.len() - 1) % self.stack.len();
        self.depth -= 1;
        Some(addr)
    }

    /// The address a return would be predicted to go to.
    pub fn peek(&self) -> Option<u64> {
        (self.depth > 0).then(|| self.stack[self.top])
    }

    /// Number of valid entries.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Up to `depth` return addresses from the top down, for an instruction prefetcher.
    pub fn prefetch_candidates(&self, depth: usize) -> Vec<u64> {
        let n = self.stack.len();
        (0..depth.min(self.depth))
            .map(|i| self.stack[(self.top + n - i) % n])
            .collect()
    }

    /// Handles calls and returns; everything else is [`PredType::NoPrediction`].
    ///
    /// A return with an empty stack is also left to the direction predictor.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        match br.kind {
            BranchKind::Call => {
                if do_update {
                    self.push(br.pc.wrapping_add(4));
                }
                PredType::NoPrediction
            }
            BranchKind::Return => {
                let Some(top) = self.peek() else {
                    return PredType::NoPrediction;
                };
                if do_update {
                    let _ = self.pop();
                }
                if top == br.target {
                    PredType::CorrectPrediction
                } else {
                    PredType::MissPrediction
                }
            }
            _ => PredType::NoPrediction,
        }
    }
}
