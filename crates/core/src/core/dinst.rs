//! Dynamic instruction records and their arena.
//!
//! Every in-flight instruction lives in a slot of a [`DInstPool`] and is
//! referenced everywhere else by an [`InstHandle`] (slot index plus
//! generation). This provides:
//! 1. **Weak back-references:** A source link to a producer that was already
//!    recycled resolves to `None`, meaning the dependency is satisfied.
//! 2. **Owned forward links:** Each record owns the list of dependents waiting
//!    for its result; the list is drained on completion and dropped on recycle.
//! 3. **Lifecycle checks:** Recycling a free slot is reported as an error instead
//!    of corrupting the free list.

use std::sync::Arc;

use crate::common::{Cycle, FlowId, SeqId, SimError};
use crate::isa::{FetchedInst, StaticInst};

/// Stable reference to a pooled dynamic instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstHandle {
    index: u32,
    generation: u32,
}

impl InstHandle {
    /// Arena slot this handle points at.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Opaque token naming the execution resource an instruction was assigned to.
///
/// The cluster collaborator chooses the value; the core only stores it and
/// checks that it was set before retirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u16);

/// Scheduling state of a dynamic instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DInstState {
    /// Pulled from the instruction source, waiting in the front-end.
    #[default]
    Fetched,
    /// Renamed and in the ROB, waiting for operands or a functional unit.
    Renamed,
    /// Accepted by the execution resource.
    Issued,
    /// Executing in a functional unit.
    Executing,
    /// Result available.
    Executed,
    /// Externally visible side effect complete.
    Performed,
    /// Committed (or discarded by a flush).
    Retired,
}

/// Transition timestamps, recorded when each state is entered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timestamps {
    /// Fetch cycle.
    pub fetched: Cycle,
    /// Rename cycle.
    pub renamed: Option<Cycle>,
    /// Issue cycle.
    pub issued: Option<Cycle>,
    /// Cycle execution completes.
    pub executed: Option<Cycle>,
    /// Cycle the side effect became visible.
    pub performed: Option<Cycle>,
    /// Commit cycle.
    pub retired: Option<Cycle>,
}

/// One in-flight instance of a decoded instruction.
#[derive(Clone, Debug)]
pub struct DInst {
    /// Program-order sequence id.
    pub id: SeqId,
    /// Hardware thread the instruction belongs to.
    pub flow: FlowId,
    /// Shared decoded template.
    pub inst: Arc<StaticInst>,
    /// Address of the instruction that actually follows.
    pub next_pc: u64,
    /// Effective address of a load or store.
    pub mem_addr: Option<u64>,
    /// Whether statistics are gathered for this instance.
    pub stats: bool,
    /// Current scheduling state.
    pub state: DInstState,
    /// State transition times.
    pub times: Timestamps,
    /// Marked by the replay controller: flushing starts when this retires.
    pub replay: bool,
    /// Fetch was blocked behind this instruction's misprediction.
    pub branch_miss: bool,
    srcs: [Option<InstHandle>; 3],
    pending: u8,
    dependents: Vec<InstHandle>,
    resource: Option<ResourceId>,
}

impl DInst {
    /// Builds a fresh record from a fetch record.
    pub fn new(id: SeqId, flow: FlowId, fetched: FetchedInst, now: Cycle) -> Self {
        Self {
            id,
            flow,
            inst: fetched.inst,
            next_pc: fetched.next_pc,
            mem_addr: fetched.mem_addr,
            stats: fetched.stats,
            state: DInstState::Fetched,
            times: Timestamps {
                fetched: now,
                ..Timestamps::default()
            },
            replay: false,
            branch_miss: false,
            srcs: [None; 3],
            pending: 0,
            dependents: Vec::new(),
            resource: None,
        }
    }

    /// Program counter.
    #[inline]
    pub fn pc(&self) -> u64 {
        self.inst.pc
    }

    /// Returns true if control left the sequential path after this instruction.
    #[inline]
    pub fn is_taken(&self) -> bool {
        self.inst.is_control() && self.next_pc != self.inst.fallthrough()
    }

    /// Returns true once the result is available.
    #[inline]
    pub const fn is_executed(&self) -> bool {
        self.times.executed.is_some()
    }

    /// Returns true once the instruction has been accepted for execution.
    #[inline]
    pub const fn is_issued(&self) -> bool {
        self.times.issued.is_some()
    }

    /// Returns true once the externally visible side effect is complete.
    #[inline]
    pub const fn is_performed(&self) -> bool {
        self.times.performed.is_some()
    }

    /// Returns true once the instruction left the retire queue.
    #[inline]
    pub const fn is_retired(&self) -> bool {
        self.times.retired.is_some()
    }

    /// Returns true when every source operand is available.
    #[inline]
    pub const fn is_ready(&self) -> bool {
        self.pending == 0
    }

    /// Backward source links: src1, src2 and the serialization link.
    pub const fn sources(&self) -> &[Option<InstHandle>; 3] {
        &self.srcs
    }

    /// Instructions waiting for this one's result.
    pub fn dependents(&self) -> &[InstHandle] {
        &self.dependents
    }

    /// Execution resource, if assigned.
    pub const fn resource(&self) -> Option<ResourceId> {
        self.resource
    }

    /// Assigns the execution resource.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ResourceReassigned`] if a resource was already set.
    pub fn set_resource(&mut self, res: ResourceId) -> Result<(), SimError> {
        if self.resource.is_some() {
            return Err(SimError::ResourceReassigned { id: self.id });
        }
        self.resource = Some(res);
        Ok(())
    }

    pub(crate) fn mark_renamed(&mut self, now: Cycle) {
        self.state = DInstState::Renamed;
        self.times.renamed = Some(now);
    }

    pub(crate) fn mark_issued(&mut self, now: Cycle) {
        self.state = DInstState::Executing;
        self.times.issued = Some(now);
    }

    pub(crate) fn mark_executed(&mut self, now: Cycle) {
        self.state = DInstState::Executed;
        self.times.executed = Some(now);
    }

    pub(crate) fn mark_performed(&mut self, now: Cycle) {
        if !self.is_retired() {
            self.state = DInstState::Performed;
        }
        self.times.performed = Some(now);
    }

    pub(crate) fn mark_retired(&mut self, now: Cycle) {
        self.state = DInstState::Retired;
        self.times.retired = Some(now);
    }

    pub(crate) fn take_dependents(&mut self) -> Vec<InstHandle> {
        std::mem::take(&mut self.dependents)
    }

    pub(crate) fn add_dependent(&mut self, h: InstHandle) {
        self.dependents.push(h);
    }

    /// Records a backward link in `slot` and counts it as pending.
    pub(crate) fn link_source(&mut self, slot: usize, producer: InstHandle) {
        self.srcs[slot] = Some(producer);
        self.pending += 1;
    }

    /// Clears one pending source. Returns true if the instruction became ready.
    pub(crate) fn source_ready(&mut self) -> bool {
        self.pending = self.pending.saturating_sub(1);
        self.pending == 0
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<DInst>,
}

/// Arena owning every in-flight dynamic instruction.
#[derive(Debug, Default)]
pub struct DInstPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl DInstPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool with room for `capacity` instructions before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Number of live instructions.
    #[inline]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no instruction is live.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Stores an instruction and returns its handle.
    pub fn alloc(&mut self, dinst: DInst) -> InstHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(dinst);
            InstHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(dinst),
            });
            InstHandle { index, generation: 0 }
        }
    }

    /// Looks up a live instruction. Returns `None` for a recycled handle.
    #[inline]
    pub fn get(&self, h: InstHandle) -> Option<&DInst> {
        self.slots
            .get(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.entry.as_ref())
    }

    /// Mutable lookup. Returns `None` for a recycled handle.
    #[inline]
    pub fn get_mut(&mut self, h: InstHandle) -> Option<&mut DInst> {
        self.slots
            .get_mut(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.entry.as_mut())
    }

    /// Returns true if the handle still names a live instruction.
    #[inline]
    pub fn contains(&self, h: InstHandle) -> bool {
        self.get(h).is_some()
    }

    /// Recycles an instruction's slot and returns the record.
    ///
    /// Outstanding handles to the slot become stale.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DoubleFree`] if the handle is already stale.
    pub fn free(&mut self, h: InstHandle) -> Result<DInst, SimError> {
        let slot = self
            .slots
            .get_mut(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .ok_or(SimError::DoubleFree { index: h.index })?;
        let dinst = slot.entry.take().ok_or(SimError::DoubleFree { index: h.index })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        self.live -= 1;
        Ok(dinst)
    }
}
