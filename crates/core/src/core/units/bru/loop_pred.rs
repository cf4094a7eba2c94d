//! Loop predictor.
//!
//! Detects branches that go the same way a fixed number of times and then
//! flip once (loop back-edges). Once the same trip count has repeated
//! `confidence` times, the loop table overrides the base predictor and
//! predicts the exit on the final iteration.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::{CounterTableConfig, LoopConfig};

#[derive(Clone, Copy, Debug, Default)]
struct LoopEntry {
    tag: u64,
    iter_counter: u32,
    curr_counter: u32,
    confidence: u8,
    dir: bool,
}

/// Tagged table of loop trip counts.
#[derive(Clone, Debug)]
pub struct LoopPredictor {
    table: Vec<LoopEntry>,
    mask: u64,
    threshold: u8,
}

impl LoopPredictor {
    /// Creates a table of `config.size` entries.
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            table: vec![LoopEntry::default(); config.size],
            mask: config.size as u64 - 1,
            threshold: config.confidence,
        }
    }

    fn entry(&self, key: u64, tag: u64) -> Option<&LoopEntry> {
        let e = &self.table[(key & self.mask) as usize];
        (e.tag == tag).then_some(e)
    }

    /// Trains on an outcome. Entries are only allocated on a taken outcome.
    pub fn update(&mut self, key: u64, tag: u64, taken: bool) {
        let e = &mut self.table[(key & self.mask) as usize];
        if e.tag != tag {
            if taken {
                *e = LoopEntry {
                    tag,
                    curr_counter: 1,
                    dir: true,
                    ..LoopEntry::default()
                };
            }
            return;
        }
        if taken == e.dir {
            e.curr_counter = e.curr_counter.saturating_add(1);
            return;
        }
        if e.curr_counter == e.iter_counter {
            e.confidence = e.confidence.saturating_add(1);
        } else {
            e.confidence = 0;
            e.iter_counter = e.curr_counter;
        }
        e.curr_counter = 0;
    }

    /// Returns true if the branch is a loop with a trusted trip count.
    pub fn is_loop(&self, key: u64, tag: u64) -> bool {
        self.entry(key, tag).is_some_and(|e| e.confidence >= self.threshold)
    }

    /// Direction the loop table predicts: the exit on the last iteration.
    pub fn is_taken(&self, key: u64, tag: u64) -> bool {
        self.entry(key, tag)
            .is_none_or(|e| if e.curr_counter == e.iter_counter { !e.dir } else { e.dir })
    }

    /// Learned trip count, 0 if unknown.
    pub fn loop_iter(&self, key: u64, tag: u64) -> u32 {
        self.entry(key, tag).map_or(0, |e| e.iter_counter)
    }
}

/// A bimodal predictor overridden by a confident loop table.
#[derive(Clone, Debug)]
pub struct LoopAugmented {
    btb: Btb,
    base: SCTable,
    loops: LoopPredictor,
}

impl LoopAugmented {
    /// Creates the predictor.
    pub fn new(base: &CounterTableConfig, config: &LoopConfig, btb: Btb) -> Self {
        Self {
            btb,
            base: SCTable::new(base.size, base.bits),
            loops: LoopPredictor::new(config),
        }
    }

    /// Loop table, for inspection.
    pub const fn loops(&self) -> &LoopPredictor {
        &self.loops
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let ptaken = if self.loops.is_loop(key, br.pc) {
            self.loops.is_taken(key, br.pc)
        } else {
            self.base.predict(key)
        };
        if do_update {
            self.base.update(key, br.taken);
            self.loops.update(key, br.pc, br.taken);
        }
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }
}
