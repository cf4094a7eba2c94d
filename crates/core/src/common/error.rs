//! Error definitions.
//!
//! This module defines the two error families of the simulator. It provides:
//! 1. **Invariant Violations:** `SimError`, raised when the timing model reaches a state
//!    that can only come from a modeling bug. These abort the run.
//! 2. **Configuration Errors:** `ConfigError`, raised while loading or validating a
//!    configuration before any simulation starts.
//! 3. **Trace Errors:** `TraceError`, raised while loading an instruction trace.
//!
//! Resource stalls and "no prediction" outcomes are ordinary values, not errors.

use thiserror::Error;

use super::types::{FlowId, SeqId};

/// Fatal invariant violation inside the timing core.
///
/// Continuing after one of these would silently corrupt the simulated
/// performance results, so every variant ends the simulation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// An instruction reached the commit step a second time.
    #[error("instruction {id} of {flow} retired twice")]
    DoubleRetire {
        /// Flow the instruction belongs to.
        flow: FlowId,
        /// Sequence id of the instruction.
        id: SeqId,
    },

    /// More registers were released than were ever charged.
    #[error("register budget underflow: released with {in_use} registers charged")]
    RegisterUnderflow {
        /// Registers charged at the time of the release.
        in_use: usize,
    },

    /// An instruction tried to leave the ROB without an execution resource.
    #[error("instruction {id} reached retirement without an execution resource")]
    UnassignedResource {
        /// Sequence id of the instruction.
        id: SeqId,
    },

    /// An execution resource was assigned to an instruction twice.
    #[error("instruction {id} was assigned an execution resource twice")]
    ResourceReassigned {
        /// Sequence id of the instruction.
        id: SeqId,
    },

    /// A pipeline structure held a handle to a recycled instruction.
    #[error("stale instruction handle (slot {index}) found in {structure}")]
    StaleHandle {
        /// Arena slot the handle pointed at.
        index: u32,
        /// Name of the structure that held the handle.
        structure: &'static str,
    },

    /// An arena slot was released twice.
    #[error("instruction slot {index} freed twice")]
    DoubleFree {
        /// Arena slot index.
        index: u32,
    },

    /// Rename pushed into a ROB that had no free slot.
    #[error("ROB overflow while renaming instruction {id}")]
    RobOverflow {
        /// Sequence id of the instruction.
        id: SeqId,
    },

    /// The instruction source handed over a register the rename tables do not cover.
    #[error("instruction {id} of {flow} at {pc:#x} names register {reg}, limit is {limit}")]
    RegisterOutOfRange {
        /// Flow the instruction belongs to.
        flow: FlowId,
        /// Sequence id the instruction would have received.
        id: SeqId,
        /// Address of the instruction.
        pc: u64,
        /// Offending register number.
        reg: u8,
        /// Number of architectural registers.
        limit: usize,
    },

    /// The retire queue was handed instructions out of program order.
    #[error("retire order violated: {younger} queued before {older}")]
    OrderViolation {
        /// The id that was already queued.
        younger: SeqId,
        /// The older id that arrived after it.
        older: SeqId,
    },
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A width, size or count that must be positive was zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    /// A table size that must be a power of two was not.
    #[error("`{field}` must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Configuration field name.
        field: &'static str,
        /// Offending value.
        value: usize,
    },

    /// A value fell outside its allowed range.
    #[error("`{field}` out of range: {reason}")]
    OutOfRange {
        /// Configuration field name.
        field: &'static str,
        /// Human-readable constraint.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Instruction trace that cannot be replayed.
#[derive(Debug, Error)]
pub enum TraceError {
    /// An operand names a register outside the renamed register file.
    #[error("trace record {index} at pc {pc:#x} uses register {reg}, limit is {limit}")]
    Register {
        /// Position of the record in the trace.
        index: usize,
        /// Address of the instruction.
        pc: u64,
        /// Offending register number.
        reg: u8,
        /// Number of architectural registers.
        limit: usize,
    },

    /// A load or store record carries no effective address.
    #[error("trace record {index} at pc {pc:#x} is a memory operation without an address")]
    MissingAddress {
        /// Position of the record in the trace.
        index: usize,
        /// Address of the instruction.
        pc: u64,
    },

    /// The trace document could not be parsed.
    #[error("malformed trace: {0}")]
    Parse(#[from] serde_json::Error),

    /// The trace file could not be read.
    #[error("cannot read trace: {0}")]
    Io(#[from] std::io::Error),
}
