//! Reference memory system.
//!
//! A flat memory with fixed latencies that still exercises the engine's
//! memory-ordering paths. It provides:
//! 1. **Load Tracking:** Executed loads stay visible until they retire or are squashed.
//! 2. **Stale Loads:** A store executing after a younger load to the same address
//!    reports that load as stale.
//! 3. **Store Drain:** Retired stores become visible after `store_latency` cycles.
//! 4. **Prefetch Sink:** Prefetch triggers are recorded for inspection.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::common::{Cycle, FlowId, SeqId};
use crate::config::MemoryModelConfig;
use crate::core::dinst::DInst;
use crate::core::pipeline::traits::{MemoryEvent, MemorySystem};
use crate::core::units::ldbp::PrefetchTrigger;

#[derive(Debug, Default)]
struct FlowMemory {
    /// Executed, not yet retired loads and their addresses.
    loads: BTreeMap<SeqId, u64>,
    /// Events with their due cycle, in insertion order.
    pending: Vec<(Cycle, MemoryEvent)>,
}

/// Fixed-latency memory model.
#[derive(Debug)]
pub struct SimpleMemory {
    store_latency: Cycle,
    load_latency: Cycle,
    flows: HashMap<FlowId, FlowMemory>,
    prefetches: Vec<PrefetchTrigger>,
    stale_loads: u64,
}

impl SimpleMemory {
    /// Builds an empty memory.
    pub fn new(config: &MemoryModelConfig) -> Self {
        Self {
            store_latency: config.store_latency,
            load_latency: config.load_latency,
            flows: HashMap::new(),
            prefetches: Vec::new(),
            stale_loads: 0,
        }
    }

    /// Queues a stale-load report for `id`, delivered at cycle `at`.
    pub fn inject_stale_load(&mut self, flow: FlowId, id: SeqId, at: Cycle) {
        self.flows.entry(flow).or_default().pending.push((at, MemoryEvent::StaleLoad(id)));
    }

    /// Prefetch triggers received so far.
    pub fn prefetches(&self) -> &[PrefetchTrigger] {
        &self.prefetches
    }

    /// Ordering violations detected so far.
    pub const fn stale_loads(&self) -> u64 {
        self.stale_loads
    }

    /// Events not yet delivered, across all flows.
    pub fn pending_events(&self) -> usize {
        self.flows.values().map(|f| f.pending.len()).sum()
    }
}

impl MemorySystem for SimpleMemory {
    fn load_latency(&mut self, _dinst: &DInst, _now: Cycle) -> Cycle {
        self.load_latency
    }

    fn executed(&mut self, dinst: &DInst, now: Cycle) {
        let Some(addr) = dinst.mem_addr else {
            return;
        };
        let f = self.flows.entry(dinst.flow).or_default();
        if dinst.inst.is_load() {
            let _ = f.loads.insert(dinst.id, addr);
            return;
        }
        // The oldest younger load that read this address saw the old value.
        let victim = f
            .loads
            .range(dinst.id.next()..)
            .find(|&(_, &a)| a == addr)
            .map(|(&id, _)| id);
        if let Some(id) = victim {
            trace!(flow = %dinst.flow, store = %dinst.id, load = %id, addr, "stale load");
            self.stale_loads += 1;
            f.pending.push((now, MemoryEvent::StaleLoad(id)));
        }
    }

    fn retired(&mut self, dinst: &DInst, now: Cycle) {
        let f = self.flows.entry(dinst.flow).or_default();
        if dinst.inst.is_load() {
            let _ = f.loads.remove(&dinst.id);
        } else if dinst.inst.is_store() {
            f.pending.push((now + self.store_latency, MemoryEvent::StoreVisible(dinst.id)));
        }
    }

    fn squashed(&mut self, flow: FlowId, id: SeqId) {
        if let Some(f) = self.flows.get_mut(&flow) {
            let _ = f.loads.remove(&id);
        }
    }

    fn poll(&mut self, flow: FlowId, now: Cycle, events: &mut Vec<MemoryEvent>) {
        let Some(f) = self.flows.get_mut(&flow) else {
            return;
        };
        f.pending.retain(|&(at, ev)| {
            if at <= now {
                events.push(ev);
                false
            } else {
                true
            }
        });
    }

    fn prefetch(&mut self, trigger: &PrefetchTrigger) {
        self.prefetches.push(*trigger);
    }
}
