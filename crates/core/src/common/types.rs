//! Identifier newtypes.
//!
//! Strong types keep sequence numbers, flow (hardware thread) numbers and
//! architectural register numbers from being mixed up at call sites.

use std::fmt;

use serde::Deserialize;

/// Simulated clock value, in core cycles.
pub type Cycle = u64;

/// Number of architectural registers tracked by the rename stage.
///
/// Integer and floating-point registers share one flat namespace:
/// `0..32` are integer registers and `32..64` floating-point registers.
pub const NUM_ARCH_REGS: usize = 64;

/// Program-order sequence number of a dynamic instruction.
///
/// Ids increase monotonically within a flow. After a replay the flow is
/// rewound and the ids from the flush point onward are handed out again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct SeqId(pub u64);

impl SeqId {
    /// Returns the id that follows this one in program order.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hardware thread context served by one pipeline engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Architectural register number.
///
/// Register 0 is the hardwired zero register: it is never renamed and a
/// source operand naming it never creates a dependency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct RegId(pub u8);

impl RegId {
    /// The hardwired zero register.
    pub const ZERO: Self = Self(0);

    /// Returns true for the hardwired zero register.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the register number as a table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.0 as usize) < 32 {
            write!(f, "r{}", self.0)
        } else {
            write!(f, "f{}", self.0 - 32)
        }
    }
}
