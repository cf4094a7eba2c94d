//! Load-branch correlation prefetcher (LDBP).
//!
//! Watches instructions as they leave the ROB and looks for a conditional
//! branch whose operand was produced by a short chain starting at a load.
//! When that load walks memory with a stable stride, the data of future
//! iterations is requested ahead of time. It provides:
//! 1. **Classify Table:** One entry per architectural register describing the
//!    load chain that produced its current value.
//! 2. **Load Generation Table:** FIFO of (load PC, branch PC) pairs with the
//!    observed stride and a confidence counter.
//! 3. **Trigger Generation:** Prefetch addresses scaled by the in-flight
//!    branch count and the recent load latency.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::{Cycle, NUM_ARCH_REGS, RegId};
use crate::core::dinst::DInst;
use crate::isa::OpClass;

/// Load generation table entries.
pub const LGT_SIZE: usize = 128;

/// Load latencies kept for the max-latency estimate.
const LATENCY_WINDOW: usize = 10;

/// Upper bound of the max-latency estimate, in cycles.
const MAX_LATENCY_CAP: Cycle = 8;

/// Fixed prefetch distance, in iterations.
const TRIGGER_DISTANCE: u64 = 8;

/// Extra addresses issued on top of a latency change.
const LATENCY_SLACK: u64 = 6;

/// Confidence a stride needs before it triggers.
const TRIGGER_CONFIDENCE: u32 = 15;

/// A speculative load request produced by the correlator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchTrigger {
    /// Address to fetch.
    pub addr: u64,
    /// Load at the head of the chain.
    pub load_pc: u64,
    /// Branch that consumed the chain.
    pub branch_pc: u64,
    /// Address the load touched most recently.
    pub start_addr: u64,
    /// Stride between consecutive instances of the load (two's complement).
    pub delta: u64,
    /// Instances of the branch in the ROB when it retired.
    pub inflight: u64,
    /// Chain shape, see [`LoadBranchCorrelator::chain_type`].
    pub chain: u8,
}

/// Which branch operand a classification is made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    /// Only src1 is a register.
    OnlySrc1,
    /// Only src2 is a register.
    OnlySrc2,
    /// Both are registers; this is src1.
    BothSrc1,
    /// Both are registers; this is src2.
    BothSrc2,
}

#[derive(Clone, Copy, Debug, Default)]
struct ClassifyEntry {
    valid: bool,
    load_pc: u64,
    load_addr: u64,
    depth: u32,
    chain: u8,
    is_li: bool,
    complex: bool,
}

impl ClassifyEntry {
    fn load_hit(&mut self, pc: u64, addr: u64) {
        *self = Self {
            valid: true,
            load_pc: pc,
            load_addr: addr,
            depth: 1,
            ..Self::default()
        };
    }

    fn alu_hit(&mut self, load_immediate: bool) {
        self.depth += 1;
        self.is_li = load_immediate;
    }

    /// Assigns the chain shape:
    ///
    /// | type | operands | chain |
    /// |------|----------|-------|
    /// | 1, 2 | one (src1, src2) | load feeds the branch directly |
    /// | 3, 4 | one (src1, src2) | load then ALU ops |
    /// | 5, 6 | one (src1, src2) | load then a load-immediate |
    /// | 7, 8 | two | ALU chain plus a load-immediate |
    /// | 9, 10 | two | direct load plus a load-immediate |
    fn branch_hit(&mut self, operand: Operand) {
        match operand {
            Operand::OnlySrc1 | Operand::OnlySrc2 => {
                let second = operand == Operand::OnlySrc2;
                self.chain = match (self.depth > 1, self.is_li, second) {
                    (false, _, false) => 1,
                    (false, _, true) => 2,
                    (true, false, false) => 3,
                    (true, false, true) => 4,
                    (true, true, false) => 5,
                    (true, true, true) => 6,
                };
            }
            Operand::BothSrc1 => {
                if self.is_li {
                    self.complex = false;
                    return;
                }
                self.chain = if self.depth > 1 { 8 } else { 10 };
                self.complex = true;
            }
            Operand::BothSrc2 => {
                self.complex = false;
                if !self.is_li {
                    self.chain = if self.depth > 1 { 7 } else { 9 };
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LgtEntry {
    load_pc: u64,
    branch_pc: u64,
    start_addr: u64,
    delta: u64,
    conf: u32,
    chain: u8,
}

impl LgtEntry {
    fn hit(&mut self, addr: u64, chain: u8) {
        let prev = self.delta;
        self.delta = addr.wrapping_sub(self.start_addr);
        self.start_addr = addr;
        if self.delta == prev {
            self.conf += 1;
        } else {
            self.conf /= 2;
        }
        self.chain = chain;
    }
}

/// Load-branch chain tracker and prefetch trigger generator.
#[derive(Clone, Debug)]
pub struct LoadBranchCorrelator {
    classify: Vec<ClassifyEntry>,
    lgt: VecDeque<LgtEntry>,
    latencies: VecDeque<Cycle>,
    max_latency: Cycle,
    last_latency: Cycle,
}

impl Default for LoadBranchCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBranchCorrelator {
    /// Creates an empty correlator.
    pub fn new() -> Self {
        Self {
            classify: vec![ClassifyEntry::default(); NUM_ARCH_REGS],
            lgt: VecDeque::with_capacity(LGT_SIZE),
            latencies: VecDeque::with_capacity(LATENCY_WINDOW),
            max_latency: 0,
            last_latency: 0,
        }
    }

    /// Chain shape recorded for `reg` (0 if unclassified).
    pub fn chain_type(&self, reg: RegId) -> u8 {
        self.classify.get(reg.index()).map_or(0, |e| e.chain)
    }

    /// Current max-latency estimate.
    pub const fn max_latency(&self) -> Cycle {
        self.max_latency
    }

    /// Stride confidence for a (load, branch) pair, if tracked.
    pub fn confidence(&self, load_pc: u64, branch_pc: u64) -> Option<u32> {
        self.lgt
            .iter()
            .find(|e| e.load_pc == load_pc && e.branch_pc == branch_pc)
            .map(|e| e.conf)
    }

    /// Observes an instruction leaving the ROB.
    ///
    /// `inflight` is the number of instances of the same branch still in the
    /// ROB. Prefetch requests are appended to `out`.
    pub fn observe(&mut self, dinst: &DInst, inflight: u64, now: Cycle, out: &mut Vec<PrefetchTrigger>) {
        let regs = dinst.inst.regs;
        match dinst.inst.op {
            OpClass::Load => {
                let issued = dinst.times.issued.unwrap_or(now);
                self.record_latency(now.saturating_sub(issued));
                if !regs.dst.is_zero() {
                    self.classify[regs.dst.index()].load_hit(dinst.pc(), dinst.mem_addr.unwrap_or(0));
                }
            }
            OpClass::IntAlu => {
                let e = &mut self.classify[regs.dst.index()];
                if e.valid && !regs.dst.is_zero() {
                    e.alu_hit(regs.src1.is_zero() && regs.src2.is_zero());
                }
            }
            OpClass::Branch => self.branch(dinst.pc(), regs.src1, regs.src2, inflight, out),
            _ => {}
        }
    }

    fn record_latency(&mut self, lat: Cycle) {
        if self.latencies.len() == LATENCY_WINDOW {
            let _ = self.latencies.pop_front();
        }
        self.latencies.push_back(lat);
        self.max_latency = self
            .latencies
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .min(MAX_LATENCY_CAP);
    }

    fn branch(&mut self, pc: u64, src1: RegId, src2: RegId, inflight: u64, out: &mut Vec<PrefetchTrigger>) {
        match (src1.is_zero(), src2.is_zero()) {
            (true, true) => {}
            (false, true) => self.classify_chain(pc, src1, Operand::OnlySrc1, inflight, out),
            (true, false) => self.classify_chain(pc, src2, Operand::OnlySrc2, inflight, out),
            (false, false) => {
                if !self.classify[src1.index()].is_li && !self.classify[src2.index()].is_li {
                    self.classify[src1.index()].chain = 0;
                    self.classify[src2.index()].chain = 0;
                    return;
                }
                self.classify_chain(pc, src1, Operand::BothSrc1, inflight, out);
                if !self.classify[src1.index()].complex {
                    self.classify_chain(pc, src2, Operand::BothSrc2, inflight, out);
                }
            }
        }
    }

    fn classify_chain(&mut self, pc: u64, reg: RegId, operand: Operand, inflight: u64, out: &mut Vec<PrefetchTrigger>) {
        let ct = &mut self.classify[reg.index()];
        if !ct.valid {
            return;
        }
        ct.branch_hit(operand);
        if matches!(operand, Operand::BothSrc1 | Operand::BothSrc2) && !ct.complex {
            return;
        }
        let ct = *ct;

        if let Some(i) = self
            .lgt
            .iter()
            .position(|e| e.load_pc == ct.load_pc && e.branch_pc == pc)
        {
            self.lgt[i].hit(ct.load_addr, ct.chain);
            if self.lgt[i].conf > TRIGGER_CONFIDENCE {
                let entry = self.lgt[i];
                self.trigger(&entry, inflight, out);
            }
            return;
        }

        if self.lgt.len() == LGT_SIZE {
            let _ = self.lgt.pop_front();
        }
        self.lgt.push_back(LgtEntry {
            load_pc: ct.load_pc,
            branch_pc: pc,
            start_addr: ct.load_addr,
            delta: 0,
            conf: 0,
            chain: ct.chain,
        });
    }

    fn trigger(&mut self, e: &LgtEntry, inflight: u64, out: &mut Vec<PrefetchTrigger>) {
        let base = inflight + TRIGGER_DISTANCE + self.max_latency;
        let at = |k: u64| PrefetchTrigger {
            addr: e.start_addr.wrapping_add(e.delta.wrapping_mul(k)),
            load_pc: e.load_pc,
            branch_pc: e.branch_pc,
            start_addr: e.start_addr,
            delta: e.delta,
            inflight,
            chain: e.chain,
        };
        let first = out.len();
        out.push(at(base));

        if e.delta != 0 {
            if self.last_latency > self.max_latency {
                let extra = self.last_latency - self.max_latency + LATENCY_SLACK;
                out.extend((1..=extra).map(|i| at(base + i)));
            } else if self.last_latency < self.max_latency {
                let extra = self.max_latency - self.last_latency + LATENCY_SLACK;
                out.extend((1..=extra).rev().map(|i| at(base.wrapping_sub(i))));
            }
        }
        self.last_latency = self.max_latency;

        trace!(
            load_pc = e.load_pc,
            branch_pc = e.branch_pc,
            addr = out[first].addr,
            count = out.len() - first,
            "ldbp trigger"
        );
    }
}
