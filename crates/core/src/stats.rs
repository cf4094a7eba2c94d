//! Simulation statistics collection and reporting.
//!
//! The timing core never owns its statistics: it reports through an injected
//! [`StatsSink`]. This module provides:
//! 1. **Sink contract:** Counter increments and averaged samples.
//! 2. **Accumulator:** `CoreStats`, which gathers everything and renders a text report.
//! 3. **No-op sink:** `NullStats`, for runs where nothing is measured.

use std::fmt;

use crate::core::pipeline::traits::StallCause;

/// Monotonic event counters emitted by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Cycles the engine was clocked while active.
    ClockTicks,
    /// Instructions pulled from the instruction source.
    Fetched,
    /// Instructions whose architectural effects were committed.
    Committed,
    /// Cycles rename found the front-end completely empty.
    NoFetch,
    /// Cycles rename found only bundles still in the decode pipe.
    NoFetch2,
    /// Rename stalled for the given cause.
    Stall(StallCause),
    /// Replays started.
    Replays,
    /// Instructions discarded by a replay flush.
    FlushedInsts,
    /// Serialization level made stronger.
    SerializeEscalate,
    /// Serialization level relaxed.
    SerializeRelax,
    /// Liveness check found no progress.
    LockDetected,
    /// Conditional branch predicted correctly.
    BranchHit,
    /// Conditional branch mispredicted.
    BranchMiss,
    /// Taken control transfer whose target was not in the BTB.
    BtbMiss,
    /// A later predictor level corrected an earlier one.
    BranchFix,
    /// A later predictor level overrode a correct earlier one.
    BranchUnfix,
    /// Return predicted correctly by the RAS.
    RasHit,
    /// Return mispredicted by the RAS.
    RasMiss,
    /// Prefetch triggers emitted by the load-branch correlator.
    LdbpTrigger,
}

/// Sampled quantities reported as averages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Average {
    /// Instructions per non-empty fetch bundle.
    FetchWidth,
    /// ROB entries in use.
    RobOccupancy,
    /// Retire queue entries in use.
    RetireQueueOccupancy,
    /// In-flight instructions lost when a replay starts.
    ReplayWasted,
}

impl Average {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        self as usize
    }
}

/// Observability interface the core reports into.
///
/// Every method has a no-op default so partial sinks are cheap to write.
pub trait StatsSink {
    /// Adds `n` to a counter.
    fn inc(&mut self, _counter: Counter, _n: u64) {}

    /// Records one sample of an averaged quantity.
    fn sample(&mut self, _avg: Average, _value: u64) {}
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStats;

impl StatsSink for NullStats {}

/// Running mean of a sampled quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningAverage {
    /// Sum of all samples.
    pub total: u64,
    /// Number of samples.
    pub samples: u64,
}

impl RunningAverage {
    /// Mean of the samples, or 0.0 when nothing was sampled.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total as f64 / self.samples as f64
        }
    }
}

/// Accumulating statistics for one core.
#[derive(Clone, Debug, Default)]
pub struct CoreStats {
    /// Cycles the engine was clocked while active.
    pub cycles: u64,
    /// Instructions fetched.
    pub fetched: u64,
    /// Instructions committed.
    pub committed: u64,
    /// Cycles with an empty front-end.
    pub no_fetch: u64,
    /// Cycles waiting on the decode pipe.
    pub no_fetch2: u64,
    /// Rename stalls per cause, indexed by [`StallCause::index`].
    pub stalls: [u64; StallCause::COUNT],
    /// Replays started.
    pub replays: u64,
    /// Instructions discarded by flushes.
    pub flushed: u64,
    /// Serialization escalations.
    pub serialize_escalations: u64,
    /// Serialization relaxations.
    pub serialize_relaxations: u64,
    /// Lock detections.
    pub locks: u64,
    /// Correct conditional branch predictions.
    pub branch_hits: u64,
    /// Conditional branch mispredictions.
    pub branch_misses: u64,
    /// BTB misses on taken transfers.
    pub btb_misses: u64,
    /// Later-level corrections.
    pub branch_fixes: u64,
    /// Later-level wrong overrides.
    pub branch_unfixes: u64,
    /// Correct RAS predictions.
    pub ras_hits: u64,
    /// RAS mispredictions.
    pub ras_misses: u64,
    /// LDBP prefetch triggers.
    pub ldbp_triggers: u64,
    averages: [RunningAverage; Average::COUNT],
}

impl CoreStats {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the running mean for an averaged quantity.
    pub const fn average(&self, avg: Average) -> RunningAverage {
        self.averages[avg.index()]
    }

    /// Returns the rename stall count for one cause.
    pub const fn stalls_for(&self, cause: StallCause) -> u64 {
        self.stalls[cause.index()]
    }

    /// Committed instructions per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.committed as f64 / self.cycles as f64
        }
    }

    /// Fraction of scored conditional branches predicted correctly.
    pub fn branch_accuracy(&self) -> f64 {
        let total = self.branch_hits + self.branch_misses;
        if total == 0 {
            0.0
        } else {
            self.branch_hits as f64 / total as f64
        }
    }

    /// Prints the selected report sections to stdout (all sections if empty).
    ///
    /// Section names: `summary`, `stalls`, `replay`, `branch`.
    pub fn print_sections(&self, sections: &[&str]) {
        let want = |s: &str| sections.is_empty() || sections.contains(&s);
        let mut out = String::new();
        if want("summary") {
            self.write_summary(&mut out);
        }
        if want("stalls") {
            self.write_stalls(&mut out);
        }
        if want("replay") {
            self.write_replay(&mut out);
        }
        if want("branch") {
            self.write_branch(&mut out);
        }
        print!("{out}");
    }

    fn write_summary(&self, out: &mut String) {
        use fmt::Write as _;
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "OUT-OF-ORDER CORE STATISTICS");
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "sim_cycles               {}", self.cycles);
        let _ = writeln!(out, "sim_insts                {}", self.committed);
        let _ = writeln!(out, "sim_fetched              {}", self.fetched);
        let _ = writeln!(out, "sim_ipc                  {:.4}", self.ipc());
        let _ = writeln!(
            out,
            "avg_fetch_width          {:.2}",
            self.average(Average::FetchWidth).mean()
        );
        let _ = writeln!(
            out,
            "avg_rob_used             {:.2}",
            self.average(Average::RobOccupancy).mean()
        );
        let _ = writeln!(
            out,
            "avg_rrob_used            {:.2}",
            self.average(Average::RetireQueueOccupancy).mean()
        );
        let _ = writeln!(out, "----------------------------------------------------------");
    }

    fn write_stalls(&self, out: &mut String) {
        use fmt::Write as _;
        let cyc = self.cycles.max(1) as f64;
        let _ = writeln!(out, "RENAME STALLS");
        let _ = writeln!(
            out,
            "  nofetch                {} ({:.2}%)",
            self.no_fetch,
            self.no_fetch as f64 / cyc * 100.0
        );
        let _ = writeln!(
            out,
            "  nofetch2               {} ({:.2}%)",
            self.no_fetch2,
            self.no_fetch2 as f64 / cyc * 100.0
        );
        for cause in StallCause::ALL {
            let n = self.stalls_for(cause);
            let _ = writeln!(out, "  {:<22} {} ({:.2}%)", cause.name(), n, n as f64 / cyc * 100.0);
        }
        let _ = writeln!(out, "----------------------------------------------------------");
    }

    fn write_replay(&self, out: &mut String) {
        use fmt::Write as _;
        let _ = writeln!(out, "REPLAY AND SERIALIZATION");
        let _ = writeln!(out, "  replay.count           {}", self.replays);
        let _ = writeln!(out, "  replay.flushed         {}", self.flushed);
        let _ = writeln!(
            out,
            "  replay.avg_wasted      {:.2}",
            self.average(Average::ReplayWasted).mean()
        );
        let _ = writeln!(out, "  serialize.escalate     {}", self.serialize_escalations);
        let _ = writeln!(out, "  serialize.relax        {}", self.serialize_relaxations);
        let _ = writeln!(out, "  lock.detected          {}", self.locks);
        let _ = writeln!(out, "----------------------------------------------------------");
    }

    fn write_branch(&self, out: &mut String) {
        use fmt::Write as _;
        let _ = writeln!(out, "BRANCH PREDICTION");
        let _ = writeln!(out, "  bp.lookups             {}", self.branch_hits + self.branch_misses);
        let _ = writeln!(out, "  bp.mispredicts         {}", self.branch_misses);
        let _ = writeln!(out, "  bp.accuracy            {:.2}%", self.branch_accuracy() * 100.0);
        let _ = writeln!(out, "  bp.btb_misses          {}", self.btb_misses);
        let _ = writeln!(out, "  bp.fixes               {}", self.branch_fixes);
        let _ = writeln!(out, "  bp.unfixes             {}", self.branch_unfixes);
        let _ = writeln!(out, "  ras.hits               {}", self.ras_hits);
        let _ = writeln!(out, "  ras.misses             {}", self.ras_misses);
        let _ = writeln!(out, "  ldbp.triggers          {}", self.ldbp_triggers);
        let _ = writeln!(out, "----------------------------------------------------------");
    }
}

impl fmt::Display for CoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_summary(&mut out);
        self.write_stalls(&mut out);
        self.write_replay(&mut out);
        self.write_branch(&mut out);
        f.write_str(&out)
    }
}

impl StatsSink for CoreStats {
    fn inc(&mut self, counter: Counter, n: u64) {
        let slot = match counter {
            Counter::ClockTicks => &mut self.cycles,
            Counter::Fetched => &mut self.fetched,
            Counter::Committed => &mut self.committed,
            Counter::NoFetch => &mut self.no_fetch,
            Counter::NoFetch2 => &mut self.no_fetch2,
            Counter::Stall(cause) => &mut self.stalls[cause.index()],
            Counter::Replays => &mut self.replays,
            Counter::FlushedInsts => &mut self.flushed,
            Counter::SerializeEscalate => &mut self.serialize_escalations,
            Counter::SerializeRelax => &mut self.serialize_relaxations,
            Counter::LockDetected => &mut self.locks,
            Counter::BranchHit => &mut self.branch_hits,
            Counter::BranchMiss => &mut self.branch_misses,
            Counter::BtbMiss => &mut self.btb_misses,
            Counter::BranchFix => &mut self.branch_fixes,
            Counter::BranchUnfix => &mut self.branch_unfixes,
            Counter::RasHit => &mut self.ras_hits,
            Counter::RasMiss => &mut self.ras_misses,
            Counter::LdbpTrigger => &mut self.ldbp_triggers,
        };
        *slot += n;
    }

    fn sample(&mut self, avg: Average, value: u64) {
        let a = &mut self.averages[avg.index()];
        a.total += value;
        a.samples += 1;
    }
}
