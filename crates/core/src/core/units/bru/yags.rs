//! YAGS predictor.
//!
//! A bimodal choice table gives each branch its bias. Two small tagged
//! caches, indexed by PC xor global history, record only the exceptions to
//! that bias: the taken cache for branches biased not-taken and the
//! not-taken cache for branches biased taken. A tag miss falls back to the
//! bias.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction, sc_table::SCTable};
use crate::config::YagsConfig;

#[derive(Clone, Debug)]
struct ExceptionCache {
    tags: Vec<Option<u64>>,
    counters: SCTable,
}

impl ExceptionCache {
    fn new(size: usize) -> Self {
        Self {
            tags: vec![None; size],
            counters: SCTable::new(size, 2),
        }
    }

    fn hit(&self, idx: usize, tag: u64) -> bool {
        self.tags[idx] == Some(tag)
    }
}

/// Yet Another Global Scheme predictor.
#[derive(Clone, Debug)]
pub struct Yags {
    btb: Btb,
    choice: SCTable,
    history_mask: u64,
    ghr: u64,
    cache_mask: u64,
    tag_mask: u64,
    taken_cache: ExceptionCache,
    not_taken_cache: ExceptionCache,
}

impl Yags {
    /// Creates the predictor.
    pub fn new(config: &YagsConfig, btb: Btb) -> Self {
        Self {
            btb,
            choice: SCTable::new(config.size, 2),
            history_mask: (1u64 << config.history_size) - 1,
            ghr: 0,
            cache_mask: config.cache_size as u64 - 1,
            tag_mask: (1u64 << config.tag_bits) - 1,
            taken_cache: ExceptionCache::new(config.cache_size),
            not_taken_cache: ExceptionCache::new(config.cache_size),
        }
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let taken = br.taken;
        let bias = self.choice.predict(key);
        let idx = ((key ^ (self.ghr & self.history_mask)) & self.cache_mask) as usize;
        let tag = key & self.tag_mask;

        // Exceptions to a taken bias live in the not-taken cache and vice versa.
        let cache = if bias { &mut self.not_taken_cache } else { &mut self.taken_cache };
        let hit = cache.hit(idx, tag);
        let ptaken = if hit { cache.counters.predict(idx as u64) } else { bias };

        if do_update {
            if hit {
                cache.counters.update(idx as u64, taken);
            } else if taken != bias {
                cache.tags[idx] = Some(tag);
                cache.counters.reset(idx as u64, taken);
            }
            // A correct exception entry shields the bias from a contrary outcome.
            if !(hit && ptaken == taken && taken != bias) {
                self.choice.update(key, taken);
            }
            self.ghr = ((self.ghr << 1) | u64::from(taken)) & self.history_mask;
        }
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }
}
