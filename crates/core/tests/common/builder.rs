use std::sync::Arc;

use ooosim_core::common::RegId;
use ooosim_core::isa::{FetchedInst, OpClass, RegOperands, StaticInst};

/// Fluent builder for a single flow's instruction stream.
///
/// The program counter follows the recorded control flow: after a taken
/// branch the next instruction is placed at the branch target.
pub struct ProgramBuilder {
    pc: u64,
    insts: Vec<FetchedInst>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new(0x1000)
    }
}

impl ProgramBuilder {
    pub fn new(pc: u64) -> Self {
        Self { pc, insts: Vec::new() }
    }

    /// `n` integer ALU operations cycling through registers 1..=8, each
    /// reading register 9, which nothing writes.
    pub fn straight_line(n: usize) -> Vec<FetchedInst> {
        let mut b = Self::default();
        for i in 0..n {
            b = b.alu(1 + (i % 8) as u8, 9, 0);
        }
        b.build()
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn op(mut self, op: OpClass, dst: u8, src1: u8, src2: u8) -> Self {
        let next = self.pc + 4;
        self.push(op, RegOperands::new(RegId(src1), RegId(src2), RegId(dst)), next, None);
        self
    }

    pub fn alu(self, dst: u8, src1: u8, src2: u8) -> Self {
        self.op(OpClass::IntAlu, dst, src1, src2)
    }

    pub fn load(mut self, dst: u8, base: u8, addr: u64) -> Self {
        let next = self.pc + 4;
        self.push(OpClass::Load, RegOperands::new(RegId(base), RegId::ZERO, RegId(dst)), next, Some(addr));
        self
    }

    pub fn store(mut self, base: u8, data: u8, addr: u64) -> Self {
        let next = self.pc + 4;
        self.push(OpClass::Store, RegOperands::new(RegId(base), RegId(data), RegId::ZERO), next, Some(addr));
        self
    }

    /// Conditional branch on `src1`; `target` is only used when taken.
    pub fn branch(mut self, src1: u8, taken: bool, target: u64) -> Self {
        let next = if taken { target } else { self.pc + 4 };
        self.push(OpClass::Branch, RegOperands::new(RegId(src1), RegId::ZERO, RegId::ZERO), next, None);
        self
    }

    /// Appends `body` `times` times, each iteration ending in a backward
    /// branch that is taken except on the last iteration.
    pub fn counted_loop(mut self, times: usize, body: impl Fn(Self) -> Self) -> Self {
        let head = self.pc;
        for i in 0..times {
            self = body(self);
            self = self.branch(0, i + 1 < times, head);
        }
        self
    }

    pub fn build(self) -> Vec<FetchedInst> {
        self.insts
    }

    fn push(&mut self, op: OpClass, regs: RegOperands, next_pc: u64, addr: Option<u64>) {
        let inst = Arc::new(StaticInst::new(self.pc, op, regs));
        self.insts.push(FetchedInst::new(inst, next_pc, addr));
        self.pc = next_pc;
    }
}
