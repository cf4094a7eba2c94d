//! Two-level adaptive predictor (PAg).
//!
//! A first-level table of per-branch local history registers selects a
//! counter in a shared second-level table. The second-level index folds the
//! PC hash in above the history bits; aliasing between branches is accepted.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::TwoLevelConfig;

/// Local-history two-level predictor.
#[derive(Clone, Debug)]
pub struct TwoLevel {
    btb: Btb,
    history: Vec<u64>,
    l1_mask: u64,
    history_size: u32,
    history_mask: u64,
    table: SCTable,
}

impl TwoLevel {
    /// Creates the predictor.
    pub fn new(config: &TwoLevelConfig, btb: Btb) -> Self {
        Self {
            btb,
            history: vec![0; config.l1_size],
            l1_mask: config.l1_size as u64 - 1,
            history_size: config.history_size,
            history_mask: (1u64 << config.history_size) - 1,
            table: SCTable::new(config.l2_size, config.bits),
        }
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let l1 = (key & self.l1_mask) as usize;
        let local = self.history[l1];
        let l2 = ((local ^ key) & self.history_mask) | (key << self.history_size);

        let ptaken = if do_update {
            self.history[l1] = ((local << 1) | u64::from(br.taken)) & self.history_mask;
            self.table.predict_update(l2, br.taken)
        } else {
            self.table.predict(l2)
        };
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }
}
