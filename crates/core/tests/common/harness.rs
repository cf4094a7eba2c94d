use ooosim_core::common::{Cycle, FlowId};
use ooosim_core::config::SimConfig;
use ooosim_core::core::OooProcessor;
use ooosim_core::core::pipeline::traits::Cluster;
use ooosim_core::isa::FetchedInst;
use ooosim_core::sim::{FixedLatencyCluster, SimpleMemory, TraceSource};
use ooosim_core::stats::CoreStats;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One engine wired to a trace source and the reference memory model.
pub struct Rig<C: Cluster = FixedLatencyCluster> {
    pub core: OooProcessor<C, CoreStats>,
    pub source: TraceSource,
    pub memory: SimpleMemory,
    pub now: Cycle,
}

impl Rig<FixedLatencyCluster> {
    pub fn new(config: &SimConfig, program: Vec<FetchedInst>) -> Self {
        Self::with_cluster(config, FixedLatencyCluster::new(&config.cluster), program)
    }
}

impl<C: Cluster> Rig<C> {
    pub fn with_cluster(config: &SimConfig, cluster: C, program: Vec<FetchedInst>) -> Self {
        init_tracing();
        let core = OooProcessor::new(FlowId(0), config, cluster, CoreStats::default()).unwrap();
        Self {
            core,
            source: TraceSource::new(vec![program]),
            memory: SimpleMemory::new(&config.memory),
            now: 0,
        }
    }

    /// Clocks the engine once and returns whether it is still busy.
    pub fn tick(&mut self) -> bool {
        let busy = self
            .core
            .advance_clock(self.now, &mut self.source, &mut self.memory)
            .unwrap();
        self.now += 1;
        busy
    }

    /// Clocks until the engine goes idle. Panics after `limit` cycles.
    pub fn run(&mut self, limit: Cycle) -> Cycle {
        let start = self.now;
        while self.tick() {
            assert!(self.now - start < limit, "engine still busy after {limit} cycles");
        }
        self.now - start
    }

    /// Clocks until `done` holds. Panics after `limit` cycles.
    pub fn run_until(&mut self, limit: Cycle, mut done: impl FnMut(&mut Self) -> bool) {
        let start = self.now;
        while !done(self) {
            assert!(self.now - start < limit, "condition not reached after {limit} cycles");
            let _ = self.tick();
        }
    }

    /// Committed sequence ids as plain numbers, in commit order.
    pub fn committed_ids(&self) -> Vec<u64> {
        self.source.committed(FlowId(0)).iter().map(|id| id.0).collect()
    }

    pub fn stats(&self) -> &CoreStats {
        self.core.stats()
    }
}
