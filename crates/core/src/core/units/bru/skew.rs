//! 2Bc-gskew predictor.
//!
//! Three banks vote: a bimodal table and two gshare tables indexed with
//! different history lengths. A meta table picks per branch between the
//! bimodal answer and the majority vote. This provides:
//! 1. **Partial update on hits:** Only the banks that took part and were right are strengthened.
//! 2. **Total update on misses:** All three banks retrain toward the outcome.
//! 3. **Meta training:** Only when the bimodal and majority answers differ.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::SkewConfig;

/// Skewed majority-vote predictor with a bimodal fallback.
#[derive(Clone, Debug)]
pub struct TwoBcgSkew {
    btb: Btb,
    bim: SCTable,
    g0: SCTable,
    g0_mask: u64,
    g1: SCTable,
    g1_mask: u64,
    meta: SCTable,
    meta_mask: u64,
    history: u64,
}

#[derive(Clone, Copy)]
struct Keys {
    bim: u64,
    g0: u64,
    g1: u64,
    meta: u64,
}

impl TwoBcgSkew {
    /// Creates the predictor.
    pub fn new(config: &SkewConfig, btb: Btb) -> Self {
        let mask = |bits: u32| (1u64 << bits) - 1;
        Self {
            btb,
            bim: SCTable::new(config.bim_size, 2),
            g0: SCTable::new(config.g0_size, 2),
            g0_mask: mask(config.g0_history),
            g1: SCTable::new(config.g1_size, 2),
            g1_mask: mask(config.g1_history),
            meta: SCTable::new(config.meta_size, 2),
            meta_mask: mask(config.meta_history),
            history: 0,
        }
    }

    fn keys(&self, key: u64) -> Keys {
        Keys {
            bim: key,
            g0: key ^ (self.history & self.g0_mask),
            // Skew G1 so the two gshare banks alias differently.
            g1: key ^ ((self.history & self.g1_mask) << 1) ^ (key >> 3),
            meta: key ^ (self.history & self.meta_mask),
        }
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let k = self.keys(key);
        let bim_dir = self.bim.predict(k.bim);
        let g0_dir = self.g0.predict(k.g0);
        let g1_dir = self.g1.predict(k.g1);
        let gskew_dir = u8::from(bim_dir) + u8::from(g0_dir) + u8::from(g1_dir) >= 2;
        let use_gskew = self.meta.predict(k.meta);
        let ptaken = if use_gskew { gskew_dir } else { bim_dir };

        if do_update {
            self.train(k, br.taken, ptaken, use_gskew, [bim_dir, g0_dir, g1_dir], gskew_dir);
        }
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }

    fn train(&mut self, k: Keys, taken: bool, ptaken: bool, use_gskew: bool, dirs: [bool; 3], gskew_dir: bool) {
        let [bim_dir, g0_dir, g1_dir] = dirs;
        if bim_dir != gskew_dir {
            self.meta.update(k.meta, gskew_dir == taken);
        }
        if ptaken == taken {
            if use_gskew {
                if bim_dir == taken {
                    self.bim.update(k.bim, taken);
                }
                if g0_dir == taken {
                    self.g0.update(k.g0, taken);
                }
                if g1_dir == taken {
                    self.g1.update(k.g1, taken);
                }
            } else {
                self.bim.update(k.bim, taken);
            }
        } else {
            self.bim.update(k.bim, taken);
            self.g0.update(k.g0, taken);
            self.g1.update(k.g1, taken);
        }
        self.history = (self.history << 1) | u64::from(taken);
    }
}
