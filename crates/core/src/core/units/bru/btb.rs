//! Branch Target Buffer (BTB).
//!
//! The BTB is a set-associative, LRU-replaced cache that maps a control
//! instruction's PC to its last taken target. Every direction predictor owns
//! one to supply targets for taken predictions and unconditional transfers.

use super::{BranchInfo, PredType};

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Default, Debug)]
struct BtbEntry {
    /// Full PC of the control instruction.
    tag: u64,
    /// The predicted target address.
    target: u64,
    /// Indicates if this entry contains valid data.
    valid: bool,
    /// Last-use stamp for LRU replacement.
    stamp: u64,
}

/// Branch Target Buffer structure.
#[derive(Clone, Debug)]
pub struct Btb {
    /// `sets * assoc` entries, one set after another.
    table: Vec<BtbEntry>,
    assoc: usize,
    set_mask: u64,
    clock: u64,
}

impl Btb {
    /// Creates a Branch Target Buffer.
    ///
    /// # Arguments
    ///
    /// * `size` - Total number of entries.
    /// * `assoc` - Ways per set. `size / assoc` must be a power of 2.
    pub fn new(size: usize, assoc: usize) -> Self {
        let assoc = assoc.clamp(1, size.max(1));
        let sets = (size / assoc).max(1);
        Self {
            table: vec![BtbEntry::default(); sets * assoc],
            assoc,
            set_mask: sets as u64 - 1,
            clock: 0,
        }
    }

    fn set_range(&self, pc: u64) -> std::ops::Range<usize> {
        let set = ((pc >> 2) & self.set_mask) as usize;
        set * self.assoc..(set + 1) * self.assoc
    }

    fn find(&self, pc: u64) -> Option<usize> {
        self.set_range(pc)
            .find(|&i| self.table[i].valid && self.table[i].tag == pc)
    }

    fn touch(&mut self, i: usize) {
        self.clock += 1;
        self.table[i].stamp = self.clock;
    }

    /// Looks up the target recorded for `pc` without touching LRU state.
    pub fn lookup(&self, pc: u64) -> Option<u64> {
        self.find(pc).map(|i| self.table[i].target)
    }

    /// Records `target` for `pc`, replacing the least recently used way on a miss.
    pub fn update(&mut self, pc: u64, target: u64) {
        let i = self.find(pc).unwrap_or_else(|| self.victim(pc));
        self.table[i] = BtbEntry {
            tag: pc,
            target,
            valid: true,
            stamp: 0,
        };
        self.touch(i);
    }

    fn victim(&self, pc: u64) -> usize {
        let range = self.set_range(pc);
        let start = range.start;
        range
            .min_by_key(|&i| if self.table[i].valid { self.table[i].stamp } else { 0 })
            .unwrap_or(start)
    }

    /// Predicts the target of a control transfer.
    ///
    /// Direct jumps and calls resolve their target at decode and always hit.
    /// A not-taken outcome needs no target. Otherwise a miss or a stale target
    /// is a [`PredType::NoBTBPrediction`].
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        if br.kind.is_direct_jump() {
            return PredType::CorrectPrediction;
        }
        if !br.taken {
            return PredType::CorrectPrediction;
        }
        let Some(i) = self.find(br.pc) else {
            if do_update {
                self.update(br.pc, br.target);
            }
            return PredType::NoBTBPrediction;
        };
        let predicted = self.table[i].target;
        if do_update {
            self.table[i].target = br.target;
            self.touch(i);
        }
        if predicted == br.target {
            PredType::CorrectPrediction
        } else {
            PredType::NoBTBPrediction
        }
    }

    /// Trains on a resolved transfer without predicting.
    pub fn update_only(&mut self, br: &BranchInfo) {
        if br.taken {
            self.update(br.pc, br.target);
        }
    }
}
