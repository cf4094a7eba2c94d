//! Trace-driven instruction source.
//!
//! Replays pre-recorded instruction streams, one per flow, through the
//! [`InstructionSource`] contract. It provides:
//! 1. **Loading:** JSON traces with shared decoded templates per static instruction.
//! 2. **Rewind:** `sync_head_tail` moves the fetch cursor back to a flushed instruction.
//! 3. **Bookkeeping:** Commits, re-executed tails and resyncs are recorded for inspection.
//!
//! Sequence ids double as trace positions: the engine numbers a flow's
//! instructions from zero in fetch order, so instruction `n` is trace record `n`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::common::{FlowId, NUM_ARCH_REGS, RegId, SeqId, TraceError};
use crate::core::pipeline::traits::InstructionSource;
use crate::isa::{FetchedInst, StaticInst};

/// One record of a trace document.
#[derive(Debug, Deserialize)]
struct TraceEntry {
    #[serde(flatten)]
    inst: StaticInst,
    /// Defaults to the fall-through address.
    #[serde(default)]
    next_pc: Option<u64>,
    #[serde(default)]
    mem_addr: Option<u64>,
}

/// Root of a trace document.
#[derive(Debug, Deserialize)]
struct TraceFile {
    flows: Vec<Vec<TraceEntry>>,
}

#[derive(Debug, Default)]
struct FlowTrace {
    insts: Vec<FetchedInst>,
    cursor: usize,
    committed: Vec<SeqId>,
    reexecuted: Vec<SeqId>,
    resyncs: Vec<SeqId>,
}

/// Instruction source backed by in-memory traces.
#[derive(Debug, Default)]
pub struct TraceSource {
    flows: Vec<FlowTrace>,
}

impl TraceSource {
    /// Wraps already decoded streams; element `i` becomes flow `i`.
    pub fn new(flows: Vec<Vec<FetchedInst>>) -> Self {
        Self {
            flows: flows
                .into_iter()
                .map(|insts| FlowTrace {
                    insts,
                    ..FlowTrace::default()
                })
                .collect(),
        }
    }

    /// Parses a JSON trace document.
    ///
    /// The document is `{"flows": [[record, ...], ...]}` where each record
    /// carries `pc`, `op`, optional `regs`, `next_pc` and `mem_addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Parse`] for malformed JSON, [`TraceError::Register`]
    /// for operands outside the register file and [`TraceError::MissingAddress`]
    /// for memory operations without an address.
    pub fn from_json(json: &str) -> Result<Self, TraceError> {
        let file: TraceFile = serde_json::from_str(json)?;
        let mut templates: HashMap<u64, Arc<StaticInst>> = HashMap::new();
        let mut flows = Vec::with_capacity(file.flows.len());
        for records in file.flows {
            let mut insts = Vec::with_capacity(records.len());
            for (index, rec) in records.into_iter().enumerate() {
                validate(index, &rec)?;
                let next_pc = rec.next_pc.unwrap_or_else(|| rec.inst.fallthrough());
                let inst = match templates.get(&rec.inst.pc) {
                    Some(t) if **t == rec.inst => Arc::clone(t),
                    _ => {
                        let t = Arc::new(rec.inst);
                        let _ = templates.insert(t.pc, Arc::clone(&t));
                        t
                    }
                };
                insts.push(FetchedInst::new(inst, next_pc, rec.mem_addr));
            }
            flows.push(insts);
        }
        debug!(flows = flows.len(), templates = templates.len(), "trace loaded");
        Ok(Self::new(flows))
    }

    /// Reads and parses a JSON trace file.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Disables statistics for the first `count` instructions of every flow.
    pub fn set_warmup(&mut self, count: usize) {
        for flow in &mut self.flows {
            for inst in flow.insts.iter_mut().take(count) {
                inst.stats = false;
            }
        }
    }

    /// Number of flows in the trace.
    pub fn flows(&self) -> usize {
        self.flows.len()
    }

    /// Instructions of `flow` not yet fetched.
    pub fn remaining(&self, flow: FlowId) -> usize {
        self.flow(flow).map_or(0, |f| f.insts.len().saturating_sub(f.cursor))
    }

    /// Committed instructions of `flow`, in commit order.
    pub fn committed(&self, flow: FlowId) -> &[SeqId] {
        self.flow(flow).map_or(&[], |f| &f.committed)
    }

    /// Instructions of `flow` that left the core before their side effect completed.
    pub fn reexecuted(&self, flow: FlowId) -> &[SeqId] {
        self.flow(flow).map_or(&[], |f| &f.reexecuted)
    }

    /// Resume points of every rewind of `flow`.
    pub fn resyncs(&self, flow: FlowId) -> &[SeqId] {
        self.flow(flow).map_or(&[], |f| &f.resyncs)
    }

    fn flow(&self, flow: FlowId) -> Option<&FlowTrace> {
        self.flows.get(flow.0 as usize)
    }
}

fn validate(index: usize, rec: &TraceEntry) -> Result<(), TraceError> {
    if let Some(RegId(reg)) = rec.inst.regs.out_of_range() {
        return Err(TraceError::Register {
            index,
            pc: rec.inst.pc,
            reg,
            limit: NUM_ARCH_REGS,
        });
    }
    if rec.inst.is_memory() && rec.mem_addr.is_none() {
        return Err(TraceError::MissingAddress { index, pc: rec.inst.pc });
    }
    Ok(())
}

impl InstructionSource for TraceSource {
    fn fetch(&mut self, flow: FlowId) -> Option<FetchedInst> {
        let f = self.flows.get_mut(flow.0 as usize)?;
        let inst = f.insts.get(f.cursor)?.clone();
        f.cursor += 1;
        Some(inst)
    }

    fn commit(&mut self, flow: FlowId, id: SeqId) {
        if let Some(f) = self.flows.get_mut(flow.0 as usize) {
            f.committed.push(id);
        }
    }

    fn reexecute_tail(&mut self, flow: FlowId, id: SeqId) {
        if let Some(f) = self.flows.get_mut(flow.0 as usize) {
            f.reexecuted.push(id);
        }
    }

    fn sync_head_tail(&mut self, flow: FlowId, resume: SeqId) {
        if let Some(f) = self.flows.get_mut(flow.0 as usize) {
            f.cursor = usize::try_from(resume.0).unwrap_or(usize::MAX).min(f.insts.len());
            f.resyncs.push(resume);
        }
    }
}
