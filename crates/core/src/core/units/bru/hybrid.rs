//! Hybrid predictor.
//!
//! A meta table chooses per branch between a gshare-style global table and a
//! bimodal local table. The meta counter trains only when exactly one of the
//! two components was right.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::HybridConfig;

/// Global/local tournament predictor.
#[derive(Clone, Debug)]
pub struct Hybrid {
    btb: Btb,
    history_size: u32,
    history_mask: u64,
    ghr: u64,
    global: SCTable,
    local: SCTable,
    meta: SCTable,
}

impl Hybrid {
    /// Creates the predictor.
    pub fn new(config: &HybridConfig, btb: Btb) -> Self {
        Self {
            btb,
            history_size: config.history_size,
            history_mask: (1u64 << config.history_size) - 1,
            ghr: 0,
            global: SCTable::new(config.global_size, config.bits),
            local: SCTable::new(config.local_size, config.bits),
            meta: SCTable::new(config.meta_size, config.bits),
        }
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let taken = br.taken;
        let l2 = ((self.ghr ^ key) & self.history_mask) | (key << self.history_size);

        let ptaken = if do_update {
            self.ghr = ((self.ghr << 1) | u64::from(taken)) & self.history_mask;
            let global_taken = self.global.predict_update(l2, taken);
            let local_taken = self.local.predict_update(key, taken);
            let use_global = if global_taken != local_taken {
                self.meta.predict_update(key, global_taken == taken)
            } else {
                self.meta.predict(key)
            };
            if use_global { global_taken } else { local_taken }
        } else if self.meta.predict(key) {
            self.global.predict(l2)
        } else {
            self.local.predict(key)
        };
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }
}
