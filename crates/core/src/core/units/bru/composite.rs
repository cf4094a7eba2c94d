//! Composite branch prediction unit.
//!
//! The front-end asks one [`BranchUnit`] about every control transfer. It provides:
//! 1. **Return Address Stack:** Calls push, returns are predicted from the stack.
//! 2. **Override Chain:** Up to three predictor levels; a later level that
//!    disagrees with an earlier one replaces its answer and costs its delay.
//! 3. **Meta Chooser:** When levels 2 and 3 disagree, a counter table picks one.
//! 4. **Accounting:** Fixes, unfixes, agreement and BTB misses go to the stats sink.

use tracing::trace;

use super::{BPred, BranchInfo, BranchKind, PredType, ras::Ras, sc_table::SCTable};
use crate::common::Cycle;
use crate::config::BranchPredictorConfig;
use crate::stats::{Counter, StatsSink};

/// What fetch learns about one control transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchPrediction {
    /// Final scored outcome.
    pub outcome: PredType,
    /// Fetch bubble the prediction costs, in cycles.
    pub delay: Cycle,
}

/// Per-level configuration copied out of the predictor config.
#[derive(Clone, Debug)]
struct Level {
    pred: BPred,
    delay: Cycle,
}

/// Multi-level branch predictor with a return address stack.
#[derive(Clone, Debug)]
pub struct BranchUnit {
    ras: Ras,
    ras_prefetch: usize,
    level1: Level,
    level2: Option<Level>,
    level3: Option<Level>,
    meta: SCTable,
    btb_miss_delay: Cycle,
    branches: u64,
    taken: u64,
    mispredicts: u64,
}

impl BranchUnit {
    /// Builds the unit described by `config`.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        let level = |kind, delay| Level {
            pred: BPred::new(kind, config),
            delay,
        };
        Self {
            ras: Ras::new(config.ras_size),
            ras_prefetch: config.ras_prefetch,
            level1: level(config.pred1, config.bpred_delay1),
            level2: config.pred2.map(|k| level(k, config.bpred_delay2)),
            level3: config.pred3.map(|k| level(k, config.bpred_delay3)),
            meta: SCTable::new(config.meta_size, 2),
            btb_miss_delay: config.btb_miss_delay,
            branches: 0,
            taken: 0,
            mispredicts: 0,
        }
    }

    /// Level-1 outcome: the RAS answers returns, the first predictor everything else.
    fn predict1<S: StatsSink>(&mut self, br: &BranchInfo, stats: &mut S) -> PredType {
        let p = self.ras.predict(br, true);
        if br.kind == BranchKind::Return && br.stats {
            match p {
                PredType::CorrectPrediction => stats.inc(Counter::RasHit, 1),
                PredType::MissPrediction => stats.inc(Counter::RasMiss, 1),
                PredType::NoPrediction | PredType::NoBTBPrediction => {}
            }
        }
        if p != PredType::NoPrediction {
            return p;
        }
        self.level1.pred.do_predict(br, true)
    }

    /// Predicts `br`, trains every level on its outcome and reports statistics.
    pub fn predict<S: StatsSink>(&mut self, br: &BranchInfo, stats: &mut S) -> BranchPrediction {
        self.branches += 1;
        self.taken += u64::from(br.taken);

        let o1 = self.predict1(br, stats);
        let mut outcome = o1;
        let mut delay = self.level1.delay;

        if let Some(l2) = self.level2.as_mut() {
            let o2 = l2.pred.do_predict(br, true);
            if o2 != o1 {
                if o2 == PredType::CorrectPrediction {
                    count(stats, br, Counter::BranchFix);
                } else if o1 == PredType::CorrectPrediction {
                    count(stats, br, Counter::BranchUnfix);
                }
                outcome = o2;
                delay = l2.delay;
            }

            if let Some(l3) = self.level3.as_mut() {
                let o3 = l3.pred.do_predict(br, true);
                if o3 != o2 {
                    let key = l3.pred.calc_hist(br.pc);
                    let use_l3 = match (o2 == PredType::CorrectPrediction, o3 == PredType::CorrectPrediction) {
                        (false, true) => self.meta.predict_update(key, true),
                        (true, false) => self.meta.predict_update(key, false),
                        _ => self.meta.predict(key),
                    };
                    if use_l3 {
                        if o3 == PredType::CorrectPrediction && outcome != PredType::CorrectPrediction {
                            count(stats, br, Counter::BranchFix);
                        } else if outcome == PredType::CorrectPrediction && o3 != PredType::CorrectPrediction {
                            count(stats, br, Counter::BranchUnfix);
                        }
                        outcome = o3;
                        delay = l3.delay;
                    }
                }
            }
        }

        match outcome {
            PredType::CorrectPrediction => {
                if !br.kind.is_unconditional() {
                    count(stats, br, Counter::BranchHit);
                }
            }
            PredType::MissPrediction => {
                self.mispredicts += 1;
                count(stats, br, Counter::BranchMiss);
            }
            PredType::NoBTBPrediction => {
                count(stats, br, Counter::BtbMiss);
                delay = delay.max(self.btb_miss_delay);
            }
            PredType::NoPrediction => {}
        }

        trace!(pc = br.pc, taken = br.taken, ?outcome, delay, "branch predicted");
        BranchPrediction { outcome, delay }
    }

    /// Return addresses an instruction prefetcher may fetch ahead.
    pub fn prefetch_candidates(&self) -> Vec<u64> {
        self.ras.prefetch_candidates(self.ras_prefetch)
    }

    /// Control transfers seen.
    pub const fn branches(&self) -> u64 {
        self.branches
    }

    /// Taken control transfers seen.
    pub const fn taken(&self) -> u64 {
        self.taken
    }

    /// Final outcomes that were mispredictions.
    pub const fn mispredicts(&self) -> u64 {
        self.mispredicts
    }

    /// Level-1 predictor, for inspection.
    pub const fn level1(&self) -> &BPred {
        &self.level1.pred
    }
}

fn count<S: StatsSink>(stats: &mut S, br: &BranchInfo, counter: Counter) {
    if br.stats {
        stats.inc(counter, 1);
    }
}
