//! Out-of-order pipeline engine.
//!
//! `OooProcessor` advances one hardware thread by one cycle per call. Each
//! tick runs, in order:
//! 1. **Fetch:** Pull a bundle from the instruction source, consulting the branch unit.
//! 2. **Decode:** Move decoded bundles into the instruction queue.
//! 3. **Execute:** Complete finished instructions, wake dependents, schedule ready ones.
//! 4. **Memory Events:** Stale loads request replays; visible stores become performed.
//! 5. **Recovery:** Finish a replay once the ROB and retire queue are empty.
//! 6. **Rename:** Admit instructions into the ROB up to the issue width.
//! 7. **Retire:** Drain the ROB into the retire queue and commit in order.
//!
//! Stall causes are counted and retried; invariant violations end the run
//! with a [`SimError`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use tracing::{debug, error, trace, warn};

use crate::common::{ConfigError, Cycle, FlowId, NUM_ARCH_REGS, SeqId, SimError};
use crate::config::SimConfig;
use crate::core::dinst::{DInst, DInstPool, InstHandle};
use crate::core::pipeline::budget::RegisterBudget;
use crate::core::pipeline::frontend::FrontEnd;
use crate::core::pipeline::rat::RegisterAliasTable;
use crate::core::pipeline::replay::{LevelChange, ReplayController, ReplayDecision};
use crate::core::pipeline::rob::{RetireQueue, Rob, RobEntry};
use crate::core::pipeline::traits::{Cluster, InstructionSource, MemoryEvent, MemorySystem, StallCause};
use crate::core::units::bru::composite::BranchUnit;
use crate::core::units::bru::{BranchInfo, PredType};
use crate::core::units::ldbp::{LoadBranchCorrelator, PrefetchTrigger};
use crate::stats::{Average, Counter, StatsSink};

/// Progress markers compared by the lock check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Progress {
    committed: u64,
    retire_head: Option<SeqId>,
    rob_head: Option<SeqId>,
}

/// Diagnostic produced when a thread made no progress between two lock checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockReport {
    /// Stuck thread.
    pub flow: FlowId,
    /// Instructions committed so far.
    pub committed: u64,
    /// Oldest instruction in the ROB.
    pub rob_head: Option<SeqId>,
    /// Oldest instruction in the retire queue.
    pub retire_head: Option<SeqId>,
    /// Live instructions of the thread.
    pub in_flight: usize,
}

fn stale(h: InstHandle, structure: &'static str) -> SimError {
    SimError::StaleHandle {
        index: h.index(),
        structure,
    }
}

/// Timing model of one out-of-order hardware thread.
#[derive(Debug)]
pub struct OooProcessor<C: Cluster, S: StatsSink> {
    flow: FlowId,
    fetch_width: usize,
    issue_width: usize,
    max_rob_size: usize,
    retire_width: usize,
    retire_delay: Cycle,

    pool: DInstPool,
    frontend: FrontEnd,
    rat: RegisterAliasTable,
    budget: RegisterBudget,
    rob: Rob,
    rrob: RetireQueue,
    replay: ReplayController,
    bpred: BranchUnit,
    ldbp: Option<LoadBranchCorrelator>,
    cluster: C,
    stats: S,

    next_id: SeqId,
    completions: BinaryHeap<Reverse<(Cycle, SeqId, InstHandle)>>,
    ready: BTreeMap<SeqId, InstHandle>,
    pending_commit: HashMap<SeqId, InstHandle>,
    committed: u64,
    last_stall: Option<StallCause>,
    last_progress: Option<Progress>,
    events: Vec<MemoryEvent>,
    triggers: Vec<PrefetchTrigger>,
}

impl<C: Cluster, S: StatsSink> OooProcessor<C, S> {
    /// Builds the engine for `flow`.
    ///
    /// # Arguments
    ///
    /// * `flow` - Hardware thread this engine models.
    /// * `config` - Simulator configuration; validated before use.
    /// * `cluster` - Execution-resource collaborator.
    /// * `stats` - Statistics sink the engine reports into.
    ///
    /// # Errors
    ///
    /// Returns the first constraint `config` violates.
    pub fn new(flow: FlowId, config: &SimConfig, cluster: C, stats: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let p = &config.pipeline;
        Ok(Self {
            flow,
            fetch_width: p.fetch_width,
            issue_width: p.issue_width,
            max_rob_size: p.max_rob_size,
            retire_width: p.retire_width,
            retire_delay: p.retire_delay,
            pool: DInstPool::with_capacity(p.max_rob_size + p.inst_queue_size),
            frontend: FrontEnd::new(p),
            rat: RegisterAliasTable::new(),
            budget: RegisterBudget::new(p.total_regs),
            rob: Rob::new(p.max_rob_size),
            rrob: RetireQueue::new(),
            replay: ReplayController::new(p),
            bpred: BranchUnit::new(&config.bpred),
            ldbp: p.enable_ldbp.then(LoadBranchCorrelator::new),
            cluster,
            stats,
            next_id: SeqId(0),
            completions: BinaryHeap::new(),
            ready: BTreeMap::new(),
            pending_commit: HashMap::new(),
            committed: 0,
            last_stall: None,
            last_progress: None,
            events: Vec::new(),
            triggers: Vec::new(),
        })
    }

    /// Hardware thread this engine models.
    pub const fn flow(&self) -> FlowId {
        self.flow
    }

    /// Instructions committed so far.
    pub const fn committed(&self) -> u64 {
        self.committed
    }

    /// Sequence id the next fetched instruction receives.
    pub const fn next_id(&self) -> SeqId {
        self.next_id
    }

    /// Instructions in the ROB.
    pub const fn rob_len(&self) -> usize {
        self.rob.len()
    }

    /// Instructions in the retire queue.
    pub fn retire_queue_len(&self) -> usize {
        self.rrob.len()
    }

    /// Live instructions anywhere in the engine.
    pub const fn in_flight(&self) -> usize {
        self.pool.len()
    }

    /// Retired stores still waiting to become visible.
    pub fn pending_stores(&self) -> usize {
        self.pending_commit.len()
    }

    /// Why rename stopped early in the last tick, if it did.
    ///
    /// `None` means rename either drained the instruction queue or used its full width.
    pub const fn last_stall(&self) -> Option<StallCause> {
        self.last_stall
    }

    /// Returns true while the thread has live instructions.
    pub const fn is_busy(&self) -> bool {
        !self.pool.is_empty()
    }

    /// Register alias table, for inspection.
    pub const fn rat(&self) -> &RegisterAliasTable {
        &self.rat
    }

    /// Rename register budget, for inspection.
    pub const fn register_budget(&self) -> &RegisterBudget {
        &self.budget
    }

    /// Replay controller, for inspection.
    pub const fn replay_controller(&self) -> &ReplayController {
        &self.replay
    }

    /// Branch unit, for inspection.
    pub const fn branch_unit(&self) -> &BranchUnit {
        &self.bpred
    }

    /// Execution cluster.
    pub const fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Statistics sink.
    pub const fn stats(&self) -> &S {
        &self.stats
    }

    /// Consumes the engine and returns its statistics sink.
    pub fn into_stats(self) -> S {
        self.stats
    }

    /// Advances the thread by one cycle.
    ///
    /// Returns whether the thread still has work. When rename stopped on a
    /// structural limit, [`last_stall`](Self::last_stall) names the cause.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] when a pipeline invariant is violated or the
    /// source names a register outside the rename tables.
    pub fn advance_clock<I, M>(&mut self, now: Cycle, source: &mut I, memory: &mut M) -> Result<bool, SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        let fetched = self.fetch(now, source)?;
        let _ = self.frontend.advance(now);
        self.execute(now, memory)?;
        self.memory_events(now, source, memory)?;
        self.check_recovery(source, memory)?;
        self.rename(now)?;
        self.retire(now, source, memory)?;

        // A predictor bubble can outlive the instruction that caused it.
        let busy = fetched > 0 || !self.pool.is_empty() || !self.frontend.can_fetch(now + 1);
        if busy {
            self.stats.inc(Counter::ClockTicks, 1);
            if !self.rob.is_empty() {
                self.stats.sample(Average::RobOccupancy, self.rob.len() as u64);
            }
            if !self.rrob.is_empty() {
                self.stats.sample(Average::RetireQueueOccupancy, self.rrob.len() as u64);
            }
        }
        Ok(busy)
    }

    fn fetch<I: InstructionSource>(&mut self, now: Cycle, source: &mut I) -> Result<usize, SimError> {
        if self.replay.is_recovering() || !self.frontend.can_fetch(now) {
            return Ok(0);
        }

        let mut bundle = Vec::with_capacity(self.fetch_width);
        while bundle.len() < self.fetch_width {
            let Some(fetched) = source.fetch(self.flow) else {
                break;
            };
            let id = self.next_id;
            if let Some(reg) = fetched.inst.regs.out_of_range() {
                error!(
                    flow = %self.flow,
                    id = %id,
                    pc = fetched.inst.pc,
                    reg = reg.0,
                    "register outside the rename tables"
                );
                return Err(SimError::RegisterOutOfRange {
                    flow: self.flow,
                    id,
                    pc: fetched.inst.pc,
                    reg: reg.0,
                    limit: NUM_ARCH_REGS,
                });
            }
            self.next_id = id.next();
            let dinst = DInst::new(id, self.flow, fetched, now);
            let br = BranchInfo::from_dinst(&dinst);
            if dinst.stats {
                self.stats.inc(Counter::Fetched, 1);
            }
            let h = self.pool.alloc(dinst);
            bundle.push(h);

            let Some(br) = br else {
                continue;
            };
            let pred = self.bpred.predict(&br, &mut self.stats);
            if pred.outcome == PredType::MissPrediction {
                if let Some(d) = self.pool.get_mut(h) {
                    d.branch_miss = true;
                }
                self.frontend.block_on(h);
                trace!(flow = %self.flow, id = %id, pc = br.pc, "fetch blocked on mispredicted branch");
                break;
            }
            if pred.delay > 0 {
                self.frontend.bubble_until(now + 1 + pred.delay);
                break;
            }
            if br.taken {
                break;
            }
        }

        let n = bundle.len();
        if n > 0 {
            self.stats.sample(Average::FetchWidth, n as u64);
            self.frontend.push_bundle(now, bundle);
        }
        Ok(n)
    }

    fn execute<M: MemorySystem>(&mut self, now: Cycle, memory: &mut M) -> Result<(), SimError> {
        while let Some(&Reverse((at, _, h))) = self.completions.peek() {
            if at > now {
                break;
            }
            let _ = self.completions.pop();
            // Flushed while executing.
            let Some(d) = self.pool.get_mut(h) else {
                continue;
            };
            d.mark_executed(now);
            if !d.inst.is_store() {
                d.mark_performed(now);
            }
            if d.inst.is_memory() {
                memory.executed(d, now);
            }
            for w in RegisterAliasTable::resolve(&mut self.pool, h)? {
                if let Some(wd) = self.pool.get(w) {
                    let _ = self.ready.insert(wd.id, w);
                }
            }
            if self.frontend.unblock_if(h) {
                trace!(flow = %self.flow, "fetch unblocked");
            }
        }

        // Everything still in flight during a flush is younger than the flush point.
        if self.replay.is_flushing() {
            return Ok(());
        }
        let mut picked = Vec::new();
        for (&id, &h) in &self.ready {
            let Some(d) = self.pool.get(h) else {
                picked.push((id, None));
                continue;
            };
            if let Some(lat) = self.cluster.schedule(d, now) {
                let extra = if d.inst.is_load() { memory.load_latency(d, now) } else { 0 };
                picked.push((id, Some((h, now + lat.max(1) + extra))));
            }
        }
        for (id, slot) in picked {
            let _ = self.ready.remove(&id);
            if let Some((h, done)) = slot {
                if let Some(d) = self.pool.get_mut(h) {
                    d.mark_issued(now);
                }
                self.completions.push(Reverse((done, id, h)));
            }
        }
        Ok(())
    }

    fn memory_events<I, M>(&mut self, now: Cycle, source: &mut I, memory: &mut M) -> Result<(), SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        let mut events = std::mem::take(&mut self.events);
        memory.poll(self.flow, now, &mut events);
        for ev in events.drain(..) {
            match ev {
                MemoryEvent::StaleLoad(id) => {
                    let _ = self.replay(id);
                }
                MemoryEvent::StoreVisible(id) => self.store_visible(id, now, source)?,
            }
        }
        self.events = events;
        Ok(())
    }

    /// Requests a replay at instruction `id`.
    ///
    /// Returns `None` if `id` is not in the ROB or retire queue.
    pub fn replay(&mut self, id: SeqId) -> Option<ReplayDecision> {
        let h = self.rob.find(id).or_else(|| self.rrob.find(id))?;
        let decision = self.replay.request(id);
        match decision {
            ReplayDecision::Started | ReplayDecision::Merged => {
                if let Some(d) = self.pool.get_mut(h) {
                    d.replay = true;
                }
                if decision == ReplayDecision::Started {
                    self.stats.inc(Counter::Replays, 1);
                    let wasted = self.rob.iter().chain(self.rrob.iter()).filter(|e| e.id >= id).count()
                        + self.frontend.in_flight();
                    self.stats.sample(Average::ReplayWasted, wasted as u64);
                }
            }
            ReplayDecision::Suppressed | ReplayDecision::Disabled => {
                trace!(flow = %self.flow, id = %id, ?decision, "replay ignored");
            }
        }
        Some(decision)
    }

    fn store_visible<I: InstructionSource>(&mut self, id: SeqId, now: Cycle, source: &mut I) -> Result<(), SimError> {
        if let Some(h) = self.pending_commit.remove(&id) {
            if let Some(d) = self.pool.get_mut(h) {
                d.mark_performed(now);
            }
            source.commit(self.flow, id);
            return self.release(h);
        }
        if let Some(h) = self.rob.find(id).or_else(|| self.rrob.find(id))
            && let Some(d) = self.pool.get_mut(h)
        {
            d.mark_performed(now);
        }
        Ok(())
    }

    fn check_recovery<I, M>(&mut self, source: &mut I, memory: &mut M) -> Result<(), SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        if !self.replay.is_flushing() || !self.rob.is_empty() || !self.rrob.is_empty() {
            return Ok(());
        }
        for h in self.frontend.drain() {
            self.discard(h, memory)?;
        }
        self.ready.clear();
        self.completions.clear();
        self.rat.flush();

        let recovery = self.replay.finish_recovery();
        match recovery.change {
            LevelChange::Escalated(_) => self.stats.inc(Counter::SerializeEscalate, 1),
            LevelChange::Relaxed(_) => self.stats.inc(Counter::SerializeRelax, 1),
            LevelChange::Unchanged => {}
        }
        self.next_id = recovery.resume;
        source.sync_head_tail(self.flow, recovery.resume);
        debug!(flow = %self.flow, resume = %recovery.resume, "fetch resumes after replay");
        Ok(())
    }

    fn rename(&mut self, now: Cycle) -> Result<(), SimError> {
        self.last_stall = None;
        if self.frontend.queued() == 0 && !self.pool.is_empty() {
            let counter = if self.frontend.in_flight() > 0 {
                Counter::NoFetch2
            } else {
                Counter::NoFetch
            };
            self.stats.inc(counter, 1);
        }

        for _ in 0..self.issue_width {
            let Some(h) = self.frontend.peek() else {
                break;
            };
            let d = self.pool.get(h).ok_or_else(|| stale(h, "instruction queue"))?;
            let id = d.id;
            let writes = d.inst.has_dst_register();

            let admitted = if self.replay.must_stall(id) {
                Err(StallCause::Replay)
            } else if self.rob.len() + self.rrob.len() >= self.max_rob_size {
                Err(StallCause::RobFull)
            } else if writes && !self.budget.has_free() {
                Err(StallCause::RegistersExhausted)
            } else {
                self.cluster.can_issue(d)
            };
            let resource = match admitted {
                Ok(r) => r,
                Err(cause) => {
                    self.stats.inc(Counter::Stall(cause), 1);
                    self.last_stall = Some(cause);
                    break;
                }
            };

            let _ = self.frontend.pop();
            if !self.rob.push(h, id) {
                error!(flow = %self.flow, id = %id, "ROB overflow");
                return Err(SimError::RobOverflow { id });
            }
            if writes {
                let _ = self.budget.charge();
            }
            self.rat.rename(&mut self.pool, h)?;
            let _ = self.replay.serialize(&mut self.pool, h)?;

            let d = self.pool.get_mut(h).ok_or_else(|| stale(h, "rename"))?;
            d.set_resource(resource)?;
            d.mark_renamed(now);
            self.cluster.add_inst(d);
            if d.is_ready() {
                let _ = self.ready.insert(id, h);
            }
            trace!(flow = %self.flow, id = %id, pc = d.pc(), "renamed");
        }
        Ok(())
    }

    fn retire<I, M>(&mut self, now: Cycle, source: &mut I, memory: &mut M) -> Result<(), SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        while let Some(&entry) = self.rob.peek_head() {
            let flushing = self.replay.is_flushing();
            let d = self.pool.get(entry.handle).ok_or_else(|| stale(entry.handle, "ROB"))?;
            if !flushing && !d.is_executed() {
                break;
            }
            if d.resource().is_none() {
                error!(flow = %self.flow, id = %entry.id, "retiring without an execution resource");
                return Err(SimError::UnassignedResource { id: entry.id });
            }
            if !self.cluster.preretire(d, flushing) {
                break;
            }

            if !flushing && let Some(ldbp) = self.ldbp.as_mut() {
                let pc = d.pc();
                let inflight = self
                    .rob
                    .iter()
                    .filter(|e| self.pool.get(e.handle).is_some_and(|o| o.inst.is_branch() && o.pc() == pc))
                    .count() as u64;
                ldbp.observe(d, inflight, now, &mut self.triggers);
                for t in self.triggers.drain(..) {
                    memory.prefetch(&t);
                    self.stats.inc(Counter::LdbpTrigger, 1);
                }
            }

            let _ = self.rob.pop_head();
            self.rrob.push(entry)?;
        }

        for _ in 0..self.retire_width {
            let Some(&entry) = self.rrob.front() else {
                break;
            };
            let d = self.pool.get(entry.handle).ok_or_else(|| stale(entry.handle, "retire queue"))?;
            if d.replay && self.replay.is_recovering() {
                self.replay.start_flushing(entry.id);
            }
            if self.replay.is_flushing() {
                let _ = self.rrob.pop_front();
                self.discard(entry.handle, memory)?;
                continue;
            }
            if d.is_retired() {
                error!(flow = %self.flow, id = %entry.id, "instruction retired twice");
                return Err(SimError::DoubleRetire {
                    flow: self.flow,
                    id: entry.id,
                });
            }
            let done = d.times.executed.unwrap_or(now);
            if done + self.retire_delay >= now {
                break;
            }
            if !self.cluster.retire(d, false) {
                break;
            }
            let _ = self.rrob.pop_front();
            self.commit(entry, now, source, memory)?;
        }
        Ok(())
    }

    fn commit<I, M>(&mut self, entry: RobEntry, now: Cycle, source: &mut I, memory: &mut M) -> Result<(), SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        let h = entry.handle;
        let d = self.pool.get_mut(h).ok_or_else(|| stale(h, "commit"))?;
        d.mark_retired(now);
        if d.inst.is_memory() {
            memory.retired(d, now);
        }
        let (counted, performed) = (d.stats, d.is_performed());

        self.replay.on_retire(h);
        self.committed += 1;
        if counted {
            self.stats.inc(Counter::Committed, 1);
        }
        if let LevelChange::Relaxed(_) = self.replay.on_commit(entry.id) {
            self.stats.inc(Counter::SerializeRelax, 1);
        }
        trace!(flow = %self.flow, id = %entry.id, performed, "commit");

        if performed {
            source.commit(self.flow, entry.id);
            self.release(h)
        } else {
            source.reexecute_tail(self.flow, entry.id);
            let _ = self.pending_commit.insert(entry.id, h);
            Ok(())
        }
    }

    /// Drops a flushed instruction without committing it.
    fn discard<M: MemorySystem>(&mut self, h: InstHandle, memory: &mut M) -> Result<(), SimError> {
        let d = self.pool.get(h).ok_or_else(|| stale(h, "flush"))?;
        if d.inst.is_memory() && d.is_issued() {
            memory.squashed(self.flow, d.id);
        }
        if d.times.renamed.is_some() {
            let _ = self.cluster.retire(d, true);
        }
        if d.stats {
            self.stats.inc(Counter::FlushedInsts, 1);
        }
        trace!(flow = %self.flow, id = %d.id, "flushed");
        let _ = self.frontend.unblock_if(h);
        self.release(h)
    }

    /// Frees an instruction that is retired and performed, or flushed.
    fn release(&mut self, h: InstHandle) -> Result<(), SimError> {
        let d = self.pool.free(h)?;
        if d.times.renamed.is_some() && d.inst.has_dst_register() {
            self.budget.release()?;
            self.rat.clear_if_match(d.inst.regs.dst, h);
        }
        Ok(())
    }

    /// Compares commit progress with the previous check.
    ///
    /// Returns a report if the thread is busy but nothing moved. The engine
    /// does not try to recover from a lock.
    pub fn retire_lock_check(&mut self) -> Option<LockReport> {
        let now = Progress {
            committed: self.committed,
            retire_head: self.rrob.front().map(|e| e.id),
            rob_head: self.rob.peek_head().map(|e| e.id),
        };
        let before = self.last_progress.replace(now);
        if before != Some(now) || !self.is_busy() {
            return None;
        }
        warn!(
            flow = %self.flow,
            committed = self.committed,
            rob_head = ?now.rob_head,
            retire_head = ?now.retire_head,
            "no commit progress since the last lock check"
        );
        self.stats.inc(Counter::LockDetected, 1);
        Some(LockReport {
            flow: self.flow,
            committed: self.committed,
            rob_head: now.rob_head,
            retire_head: now.retire_head,
            in_flight: self.pool.len(),
        })
    }
}
