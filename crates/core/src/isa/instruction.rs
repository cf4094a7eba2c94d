//! Instruction templates.
//!
//! Provides the read-only decoded form of an instruction (`StaticInst`) shared
//! between every dynamic instance of it, and the record the instruction source
//! emits per fetched instance (`FetchedInst`).

use std::sync::Arc;

use serde::Deserialize;

use crate::common::{NUM_ARCH_REGS, RegId};

/// Operation class of a decoded instruction.
///
/// The class decides which execution latency applies, whether the instruction
/// takes part in memory ordering, and how the branch predictor treats it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OpClass {
    /// Integer ALU operation.
    #[default]
    IntAlu,
    /// Integer multiply.
    IntMult,
    /// Integer divide.
    IntDiv,
    /// Floating-point add/compare/convert.
    FpAlu,
    /// Floating-point multiply or fused multiply-add.
    FpMult,
    /// Floating-point divide or square root.
    FpDiv,
    /// Memory load.
    Load,
    /// Memory store.
    Store,
    /// Conditional branch.
    Branch,
    /// Unconditional direct jump.
    Jump,
    /// Unconditional indirect jump.
    IndirectJump,
    /// Function call (direct or indirect); pushes the return address.
    Call,
    /// Function return; pops the return address.
    Return,
    /// No operation.
    Nop,
}

impl OpClass {
    /// Number of operation classes; sizes per-class tables.
    pub const COUNT: usize = 14;

    /// Dense index of the class, for per-class tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The three register operands of an instruction.
///
/// An absent operand is encoded as [`RegId::ZERO`], which the rename stage
/// never treats as a dependency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub struct RegOperands {
    /// First source register (base address for memory operations).
    #[serde(default)]
    pub src1: RegId,
    /// Second source register (store data for stores).
    #[serde(default)]
    pub src2: RegId,
    /// Destination register.
    #[serde(default)]
    pub dst: RegId,
}

impl RegOperands {
    /// Creates an operand triple.
    pub const fn new(src1: RegId, src2: RegId, dst: RegId) -> Self {
        Self { src1, src2, dst }
    }

    /// Returns the source registers.
    #[inline]
    pub const fn sources(&self) -> [RegId; 2] {
        [self.src1, self.src2]
    }

    /// Returns the highest register outside the tracked namespace, if any.
    pub fn out_of_range(&self) -> Option<RegId> {
        [self.src1, self.src2, self.dst]
            .into_iter()
            .filter(|r| usize::from(r.0) >= NUM_ARCH_REGS)
            .max()
    }
}

/// Decoded, read-only description of one static instruction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StaticInst {
    /// Address of the instruction.
    pub pc: u64,
    /// Operation class.
    pub op: OpClass,
    /// Register operands.
    #[serde(default)]
    pub regs: RegOperands,
}

impl StaticInst {
    /// Creates a template.
    pub const fn new(pc: u64, op: OpClass, regs: RegOperands) -> Self {
        Self { pc, op, regs }
    }

    /// Returns true for loads and stores.
    #[inline]
    pub const fn is_memory(&self) -> bool {
        matches!(self.op, OpClass::Load | OpClass::Store)
    }

    /// Returns true for loads.
    #[inline]
    pub const fn is_load(&self) -> bool {
        matches!(self.op, OpClass::Load)
    }

    /// Returns true for stores.
    #[inline]
    pub const fn is_store(&self) -> bool {
        matches!(self.op, OpClass::Store)
    }

    /// Returns true for every control-transfer instruction.
    #[inline]
    pub const fn is_control(&self) -> bool {
        matches!(
            self.op,
            OpClass::Branch | OpClass::Jump | OpClass::IndirectJump | OpClass::Call | OpClass::Return
        )
    }

    /// Returns true for conditional branches.
    #[inline]
    pub const fn is_branch(&self) -> bool {
        matches!(self.op, OpClass::Branch)
    }

    /// Returns true for unconditional control transfers.
    #[inline]
    pub const fn is_jump(&self) -> bool {
        self.is_control() && !self.is_branch()
    }

    /// Returns true for function calls.
    #[inline]
    pub const fn is_call(&self) -> bool {
        matches!(self.op, OpClass::Call)
    }

    /// Returns true for function returns.
    #[inline]
    pub const fn is_return(&self) -> bool {
        matches!(self.op, OpClass::Return)
    }

    /// Returns true if the instruction writes a renamed register.
    #[inline]
    pub const fn has_dst_register(&self) -> bool {
        !self.regs.dst.is_zero()
    }

    /// Address of the next sequential instruction.
    #[inline]
    pub const fn fallthrough(&self) -> u64 {
        self.pc.wrapping_add(4)
    }
}

/// One dynamic instance of an instruction as produced by the instruction source.
///
/// The source already executed the instruction functionally, so the real
/// control-flow outcome and the effective memory address are known up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedInst {
    /// Shared decoded template.
    pub inst: Arc<StaticInst>,
    /// Address of the instruction that actually follows this one.
    pub next_pc: u64,
    /// Effective address for loads and stores.
    pub mem_addr: Option<u64>,
    /// Whether statistics should be gathered for this instance (false during warm-up).
    pub stats: bool,
}

impl FetchedInst {
    /// Creates a fetch record with statistics enabled.
    pub fn new(inst: Arc<StaticInst>, next_pc: u64, mem_addr: Option<u64>) -> Self {
        Self {
            inst,
            next_pc,
            mem_addr,
            stats: true,
        }
    }

    /// Returns true if control left the sequential path after this instruction.
    #[inline]
    pub fn is_taken(&self) -> bool {
        self.inst.is_control() && self.next_pc != self.inst.fallthrough()
    }
}
