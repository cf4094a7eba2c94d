//! Multi-flow simulation driver.
//!
//! Owns one [`OooProcessor`] per hardware thread and advances them on a
//! shared clock against a common instruction source and memory system.
//! It provides:
//! 1. **Clocking:** Every engine ticks once per cycle in flow order.
//! 2. **Lock Checks:** Every `lock_check_interval` cycles each busy engine must
//!    have made commit progress; stuck engines are reported.
//! 3. **Run Summary:** Cycle count, per-flow commits and lock reports.

use tracing::info;

use crate::common::{ConfigError, Cycle, FlowId, SimError};
use crate::config::SimConfig;
use crate::core::pipeline::traits::{Cluster, InstructionSource, MemorySystem};
use crate::core::pipeline::{LockReport, OooProcessor};
use crate::stats::StatsSink;

/// Outcome of [`Simulator::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles simulated by this run.
    pub cycles: Cycle,
    /// Instructions committed per flow, indexed by flow number.
    pub committed: Vec<u64>,
    /// Locks detected during the run.
    pub locks: Vec<LockReport>,
    /// False if the run stopped at the cycle limit with work left.
    pub finished: bool,
}

/// Cycle-driven simulator over several hardware threads.
#[derive(Debug)]
pub struct Simulator<C: Cluster, S: StatsSink> {
    cores: Vec<OooProcessor<C, S>>,
    clock: Cycle,
    lock_check_interval: Cycle,
}

impl<C: Cluster, S: StatsSink> Simulator<C, S> {
    /// Builds `flows` engines from one configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Shared configuration for every engine.
    /// * `flows` - Number of hardware threads.
    /// * `cluster` - Builds the execution cluster of a flow.
    /// * `stats` - Builds the statistics sink of a flow.
    ///
    /// # Errors
    ///
    /// Returns the first constraint `config` violates.
    pub fn new(
        config: &SimConfig,
        flows: u32,
        mut cluster: impl FnMut(FlowId) -> C,
        mut stats: impl FnMut(FlowId) -> S,
    ) -> Result<Self, ConfigError> {
        let cores = (0..flows)
            .map(FlowId)
            .map(|f| OooProcessor::new(f, config, cluster(f), stats(f)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            cores,
            clock: 0,
            lock_check_interval: config.pipeline.lock_check_interval,
        })
    }

    /// Current cycle.
    pub const fn clock(&self) -> Cycle {
        self.clock
    }

    /// Every engine, in flow order.
    pub fn cores(&self) -> &[OooProcessor<C, S>] {
        &self.cores
    }

    /// Engine of `flow`.
    pub fn core(&self, flow: FlowId) -> Option<&OooProcessor<C, S>> {
        self.cores.get(flow.0 as usize)
    }

    /// Mutable engine of `flow`, for injecting replays.
    pub fn core_mut(&mut self, flow: FlowId) -> Option<&mut OooProcessor<C, S>> {
        self.cores.get_mut(flow.0 as usize)
    }

    /// Consumes the simulator and returns every engine's statistics sink.
    pub fn into_stats(self) -> Vec<S> {
        self.cores.into_iter().map(OooProcessor::into_stats).collect()
    }

    /// Advances every engine by one cycle.
    ///
    /// Returns whether any engine still has work.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation raised by an engine.
    pub fn tick<I, M>(&mut self, source: &mut I, memory: &mut M) -> Result<bool, SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        let now = self.clock;
        let mut busy = false;
        for core in &mut self.cores {
            busy |= core.advance_clock(now, source, memory)?;
        }
        self.clock += 1;
        Ok(busy)
    }

    /// Runs until every engine is idle or `max_cycles` cycles have elapsed.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation raised by an engine.
    pub fn run<I, M>(&mut self, source: &mut I, memory: &mut M, max_cycles: Cycle) -> Result<RunSummary, SimError>
    where
        I: InstructionSource,
        M: MemorySystem,
    {
        let start = self.clock;
        let mut locks = Vec::new();
        let mut finished = false;
        while self.clock - start < max_cycles {
            if !self.tick(source, memory)? {
                finished = true;
                break;
            }
            if self.lock_check_interval > 0 && self.clock % self.lock_check_interval == 0 {
                locks.extend(self.cores.iter_mut().filter_map(OooProcessor::retire_lock_check));
            }
        }

        let summary = RunSummary {
            cycles: self.clock - start,
            committed: self.cores.iter().map(OooProcessor::committed).collect(),
            locks,
            finished,
        };
        info!(
            cycles = summary.cycles,
            committed = summary.committed.iter().sum::<u64>(),
            locks = summary.locks.len(),
            finished,
            "simulation run complete"
        );
        Ok(summary)
    }
}
