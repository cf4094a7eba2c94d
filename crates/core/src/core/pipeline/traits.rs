//! Collaborator interfaces.
//!
//! The pipeline engine talks to the rest of the simulator only through the
//! narrow contracts defined here. It provides:
//! 1. **Instruction Source:** The functional emulator feeding decoded instructions.
//! 2. **Cluster:** The execution-resource allocator and scheduler.
//! 3. **Memory System:** Load latency, stale-load detection and store visibility.
//! 4. **Stall Causes:** The non-fatal reasons rename can refuse an instruction.

use crate::common::{Cycle, FlowId, SeqId};
use crate::core::dinst::{DInst, ResourceId};
use crate::core::units::ldbp::PrefetchTrigger;
use crate::isa::FetchedInst;

/// Reason rename refused an instruction this cycle.
///
/// Stalls are retried on the next tick and never escalate to errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StallCause {
    /// Waiting for a replay flush to finish before younger instructions may enter.
    Replay,
    /// ROB plus retire queue at capacity.
    RobFull,
    /// Rename register budget exhausted.
    RegistersExhausted,
    /// The cluster's instruction window is full.
    WindowFull,
    /// The load/store queue is full.
    LsqFull,
    /// The store buffer cannot take another store.
    StoreBufferFull,
}

impl StallCause {
    /// Number of stall causes.
    pub const COUNT: usize = 6;

    /// Every cause, in report order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Replay,
        Self::RobFull,
        Self::RegistersExhausted,
        Self::WindowFull,
        Self::LsqFull,
        Self::StoreBufferFull,
    ];

    /// Dense index, for per-cause tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Label used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::RobFull => "ROB full",
            Self::RegistersExhausted => "registers",
            Self::WindowFull => "window",
            Self::LsqFull => "LSQ full",
            Self::StoreBufferFull => "store buffer",
        }
    }
}

/// Functional instruction source (emulator) for one or more flows.
pub trait InstructionSource {
    /// Returns the next decoded instruction of `flow`, or `None` if the stream is exhausted
    /// or temporarily unavailable.
    fn fetch(&mut self, flow: FlowId) -> Option<FetchedInst>;

    /// The instruction's architectural effects are final.
    fn commit(&mut self, flow: FlowId, id: SeqId);

    /// The instruction left the core before its side effect completed; the
    /// emulator must keep its tail state until the matching [`commit`](Self::commit).
    fn reexecute_tail(&mut self, flow: FlowId, id: SeqId);

    /// Rewinds `flow` after a flush so the next fetch returns instruction `resume`.
    fn sync_head_tail(&mut self, flow: FlowId, resume: SeqId);
}

/// Execution-resource allocator and scheduler.
///
/// The engine gates admission; the cluster decides which ready instruction
/// runs where and for how long.
pub trait Cluster {
    /// Checks whether a renamed instruction can be accepted and names the
    /// resource it will use.
    ///
    /// # Errors
    ///
    /// Returns the stall cause if the instruction must wait.
    fn can_issue(&mut self, dinst: &DInst) -> Result<ResourceId, StallCause>;

    /// Accepts an instruction that passed [`can_issue`](Self::can_issue).
    fn add_inst(&mut self, dinst: &DInst);

    /// Offers an operand-ready instruction for execution this cycle.
    ///
    /// Returns the execution latency if it was accepted, `None` to retry next cycle.
    fn schedule(&mut self, dinst: &DInst, now: Cycle) -> Option<Cycle>;

    /// Whether the ROB head may move to the retire queue.
    fn preretire(&mut self, dinst: &DInst, flushing: bool) -> bool;

    /// Performs the resource-side retire action. Returns false to retry next cycle.
    fn retire(&mut self, dinst: &DInst, flushing: bool) -> bool;
}

/// Notification from the memory system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryEvent {
    /// The load consumed a value that an older store later overwrote.
    StaleLoad(SeqId),
    /// The store became globally visible.
    StoreVisible(SeqId),
}

/// Memory-system collaborator.
pub trait MemorySystem {
    /// Extra cycles a load spends accessing memory.
    fn load_latency(&mut self, _dinst: &DInst, _now: Cycle) -> Cycle {
        0
    }

    /// A load or store finished executing.
    fn executed(&mut self, dinst: &DInst, now: Cycle);

    /// A load or store committed; stores start draining to memory.
    fn retired(&mut self, dinst: &DInst, now: Cycle);

    /// An instruction was discarded by a flush.
    fn squashed(&mut self, flow: FlowId, id: SeqId);

    /// Appends pending events for `flow` that are due at `now`.
    fn poll(&mut self, flow: FlowId, now: Cycle, events: &mut Vec<MemoryEvent>);

    /// Receives a speculative prefetch request.
    fn prefetch(&mut self, _trigger: &PrefetchTrigger) {}
}
