//! Bimodal (n-bit counter) predictor.
//!
//! One saturating counter per hashed PC.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::CounterTableConfig;

/// Per-PC saturating counter predictor.
#[derive(Clone, Debug)]
pub struct TwoBit {
    btb: Btb,
    table: SCTable,
}

impl TwoBit {
    /// Creates the predictor.
    pub fn new(config: &CounterTableConfig, btb: Btb) -> Self {
        Self {
            btb,
            table: SCTable::new(config.size, config.bits),
        }
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let ptaken = if do_update {
            self.table.predict_update(key, br.taken)
        } else {
            self.table.predict(key)
        };
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }

    /// Counter backing `key`, for inspection.
    pub fn counter(&self, key: u64) -> u8 {
        self.table.counter(key)
    }
}
