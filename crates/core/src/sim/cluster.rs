//! Reference execution cluster.
//!
//! A single pool of fixed-latency functional units behind a shared
//! instruction window and load/store queue. It provides:
//! 1. **Admission:** Window and LSQ occupancy decide whether rename may proceed.
//! 2. **Issue:** At most `issue_width` ready instructions start per cycle.
//! 3. **Latency:** One fixed latency per operation class.

use crate::common::Cycle;
use crate::config::{ClusterConfig, LatencyConfig};
use crate::core::dinst::{DInst, ResourceId};
use crate::core::pipeline::traits::{Cluster, StallCause};
use crate::isa::OpClass;

/// Execution cluster with fixed per-class latencies.
#[derive(Clone, Debug)]
pub struct FixedLatencyCluster {
    window_size: usize,
    lsq_size: usize,
    issue_width: usize,
    latencies: LatencyConfig,

    window_used: usize,
    lsq_used: usize,
    cycle: Cycle,
    issued_this_cycle: usize,
    issued: u64,
}

impl FixedLatencyCluster {
    /// Builds an idle cluster.
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            window_size: config.window_size,
            lsq_size: config.lsq_size,
            issue_width: config.issue_width,
            latencies: config.latencies.clone(),
            window_used: 0,
            lsq_used: 0,
            cycle: 0,
            issued_this_cycle: 0,
            issued: 0,
        }
    }

    /// Renamed instructions that have not issued yet.
    pub const fn window_used(&self) -> usize {
        self.window_used
    }

    /// Memory operations holding a load/store queue entry.
    pub const fn lsq_used(&self) -> usize {
        self.lsq_used
    }

    /// Instructions issued since construction.
    pub const fn issued(&self) -> u64 {
        self.issued
    }

    /// Execution latency of `op`.
    pub const fn latency(&self, op: OpClass) -> Cycle {
        let l = &self.latencies;
        match op {
            OpClass::IntAlu | OpClass::Nop => l.int_alu,
            OpClass::IntMult => l.int_mult,
            OpClass::IntDiv => l.int_div,
            OpClass::FpAlu => l.fp_alu,
            OpClass::FpMult => l.fp_mult,
            OpClass::FpDiv => l.fp_div,
            OpClass::Load => l.load,
            OpClass::Store => l.store,
            OpClass::Branch | OpClass::Jump | OpClass::IndirectJump | OpClass::Call | OpClass::Return => l.branch,
        }
    }
}

impl Cluster for FixedLatencyCluster {
    fn can_issue(&mut self, dinst: &DInst) -> Result<ResourceId, StallCause> {
        if self.window_used >= self.window_size {
            return Err(StallCause::WindowFull);
        }
        if dinst.inst.is_memory() && self.lsq_used >= self.lsq_size {
            return Err(StallCause::LsqFull);
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(ResourceId(dinst.inst.op.index() as u16))
    }

    fn add_inst(&mut self, dinst: &DInst) {
        self.window_used += 1;
        if dinst.inst.is_memory() {
            self.lsq_used += 1;
        }
    }

    fn schedule(&mut self, dinst: &DInst, now: Cycle) -> Option<Cycle> {
        if now != self.cycle {
            self.cycle = now;
            self.issued_this_cycle = 0;
        }
        if self.issued_this_cycle >= self.issue_width {
            return None;
        }
        self.issued_this_cycle += 1;
        self.issued += 1;
        self.window_used = self.window_used.saturating_sub(1);
        Some(self.latency(dinst.inst.op))
    }

    fn preretire(&mut self, dinst: &DInst, flushing: bool) -> bool {
        // Flushed before issue: the window slot is still held.
        if flushing && !dinst.is_issued() {
            self.window_used = self.window_used.saturating_sub(1);
        }
        true
    }

    fn retire(&mut self, dinst: &DInst, _flushing: bool) -> bool {
        if dinst.inst.is_memory() {
            self.lsq_used = self.lsq_used.saturating_sub(1);
        }
        true
    }
}
