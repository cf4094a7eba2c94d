//! O-GEHL predictor (optimized geometric history length).
//!
//! M tables of signed counters are indexed with global history lengths that
//! grow geometrically, the first one with no history at all. This provides:
//! 1. **Voting:** The prediction is the sign of the summed counters (plus an M/2 bias).
//! 2. **Threshold training:** Counters train on a misprediction or when |sum| < θ.
//! 3. **Adaptive θ:** A saturating TC counter raises θ after repeated
//!    mispredictions and lowers it after repeated low-confidence hits.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction};
use crate::config::OgehlConfig;

/// Saturation bound of the θ training counter.
const TC_LIMIT: i32 = 64;

/// Global history as a bit vector, newest outcome in bit 0.
#[derive(Clone, Debug)]
struct History {
    words: Vec<u64>,
}

impl History {
    fn new(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64).max(1)],
        }
    }

    fn push(&mut self, taken: bool) {
        let mut carry = u64::from(taken);
        for w in &mut self.words {
            let out = *w >> 63;
            *w = (*w << 1) | carry;
            carry = out;
        }
    }

    fn bit(&self, i: usize) -> u64 {
        (self.words[i / 64] >> (i % 64)) & 1
    }

    /// Folds the newest `len` bits into `width` bits by xor.
    fn fold(&self, len: usize, width: u32) -> u64 {
        let mut h = 0u64;
        for i in 0..len {
            h ^= self.bit(i) << (i % width as usize);
        }
        h
    }
}

/// Geometric history length perceptron-like predictor.
#[derive(Clone, Debug)]
pub struct Ogehl {
    btb: Btb,
    tables: Vec<Vec<i8>>,
    lengths: Vec<usize>,
    log_size: u32,
    mask: u64,
    cmax: i8,
    cmin: i8,
    theta: i32,
    tc: i32,
    history: History,
}

impl Ogehl {
    /// Creates the predictor.
    pub fn new(config: &OgehlConfig, btb: Btb) -> Self {
        let m = config.tables;
        let size = 1usize << config.log_size;
        let half = 1i16 << (config.counter_bits - 1);
        Self {
            btb,
            tables: vec![vec![0; size]; m],
            lengths: geometric_lengths(m, config.max_history),
            log_size: config.log_size,
            mask: size as u64 - 1,
            cmax: (half - 1) as i8,
            cmin: (-half) as i8,
            theta: m as i32,
            tc: 0,
            history: History::new(config.max_history),
        }
    }

    /// History length used by each table.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Current training threshold θ.
    pub const fn theta(&self) -> i32 {
        self.theta
    }

    fn index(&self, table: usize, key: u64) -> usize {
        let fold = self.history.fold(self.lengths[table], self.log_size);
        ((fold ^ key ^ (key >> (table + 1))) & self.mask) as usize
    }

    /// Predicts `br`, whose history hash is `key`.
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let idx: Vec<usize> = (0..self.tables.len()).map(|t| self.index(t, key)).collect();
        let sum = self.tables.len() as i32 / 2
            + idx
                .iter()
                .enumerate()
                .map(|(t, &i)| i32::from(self.tables[t][i]))
                .sum::<i32>();
        let ptaken = sum >= 0;

        if do_update {
            self.train(&idx, sum, ptaken, br.taken);
        }
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }

    fn train(&mut self, idx: &[usize], sum: i32, ptaken: bool, taken: bool) {
        let miss = ptaken != taken;
        if miss || sum.abs() < self.theta {
            for (t, &i) in idx.iter().enumerate() {
                let c = &mut self.tables[t][i];
                if taken {
                    if *c < self.cmax {
                        *c += 1;
                    }
                } else if *c > self.cmin {
                    *c -= 1;
                }
            }
        }
        if miss {
            self.tc += 1;
            if self.tc >= TC_LIMIT - 1 {
                self.theta += 1;
                self.tc = 0;
            }
        } else if sum.abs() < self.theta {
            self.tc -= 1;
            if self.tc <= -TC_LIMIT {
                self.theta = (self.theta - 1).max(0);
                self.tc = 0;
            }
        }
        self.history.push(taken);
    }
}

/// History lengths 0, L1, ..., `max` growing by a constant ratio.
fn geometric_lengths(tables: usize, max: usize) -> Vec<usize> {
    let mut lengths = vec![0; tables];
    if tables < 2 {
        return lengths;
    }
    let first = 2f64.min(max as f64);
    let steps = (tables - 2).max(1) as f64;
    let ratio = (max as f64 / first).powf(1.0 / steps);
    for (i, l) in lengths.iter_mut().enumerate().skip(1) {
        *l = (first * ratio.powi(i as i32 - 1) + 0.5) as usize;
    }
    lengths[tables - 1] = max;
    lengths
}
