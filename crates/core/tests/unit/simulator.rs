//! Simulator Driver Tests.
//!
//! Runs several hardware threads on a shared clock and checks the periodic
//! lock detection that flags a thread making no commit progress.

use ooosim_core::Simulator;
use ooosim_core::common::{FlowId, SeqId};
use ooosim_core::config::SimConfig;
use ooosim_core::core::OooProcessor;
use ooosim_core::sim::{FixedLatencyCluster, SimpleMemory, TraceSource};
use ooosim_core::stats::CoreStats;
use pretty_assertions::assert_eq;

use crate::common::mocks::permissive_cluster;
use crate::common::{ProgramBuilder, init_tracing};

fn lock_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.pipeline.lock_check_interval = 50;
    config
}

#[test]
fn stuck_flow_is_reported_at_every_check_after_the_first() {
    init_tracing();
    let config = lock_config();
    let mut sim = Simulator::new(&config, 1, |_| permissive_cluster(false), |_| CoreStats::default()).unwrap();
    let mut source = TraceSource::new(vec![ProgramBuilder::straight_line(6)]);
    let mut memory = SimpleMemory::new(&config.memory);

    let summary = sim.run(&mut source, &mut memory, 200).unwrap();

    assert!(!summary.finished);
    assert_eq!(summary.committed, vec![0]);
    // Checks at 50, 100, 150 and 200; the first only records progress.
    assert_eq!(summary.locks.len(), 3);
    let report = &summary.locks[0];
    assert_eq!(report.flow, FlowId(0));
    assert_eq!(report.committed, 0);
    assert_eq!(report.retire_head, Some(SeqId(0)));
    assert_eq!(report.in_flight, 6);
    assert_eq!(sim.core(FlowId(0)).map(|c| c.stats().locks), Some(3));
}

#[test]
fn only_the_stuck_flow_is_reported() {
    init_tracing();
    let config = lock_config();
    let mut sim = Simulator::new(
        &config,
        2,
        |flow| permissive_cluster(flow != FlowId(0)),
        |_| CoreStats::default(),
    )
    .unwrap();
    let mut source = TraceSource::new(vec![ProgramBuilder::straight_line(6), ProgramBuilder::straight_line(30)]);
    let mut memory = SimpleMemory::new(&config.memory);

    let summary = sim.run(&mut source, &mut memory, 300).unwrap();

    assert_eq!(summary.committed, vec![0, 30]);
    assert!(!summary.locks.is_empty());
    assert!(summary.locks.iter().all(|r| r.flow == FlowId(0)));
    assert_eq!(source.committed(FlowId(1)).len(), 30);
}

#[test]
fn direct_lock_check_needs_two_samples() {
    init_tracing();
    let config = SimConfig::default();
    let mut core = OooProcessor::new(FlowId(0), &config, permissive_cluster(false), CoreStats::default()).unwrap();
    let mut source = TraceSource::new(vec![ProgramBuilder::straight_line(4)]);
    let mut memory = SimpleMemory::new(&config.memory);

    for now in 0..40 {
        let _ = core.advance_clock(now, &mut source, &mut memory).unwrap();
    }
    assert_eq!(core.retire_lock_check(), None);
    for now in 40..80 {
        let _ = core.advance_clock(now, &mut source, &mut memory).unwrap();
    }
    assert!(core.retire_lock_check().is_some());
    assert_eq!(core.stats().locks, 1);
}

#[test]
fn progressing_flow_is_never_reported() {
    init_tracing();
    let config = lock_config();
    let mut sim = Simulator::new(
        &config,
        1,
        |_| FixedLatencyCluster::new(&config.cluster),
        |_| CoreStats::default(),
    )
    .unwrap();
    let mut source = TraceSource::new(vec![ProgramBuilder::straight_line(400)]);
    let mut memory = SimpleMemory::new(&config.memory);

    let summary = sim.run(&mut source, &mut memory, 20_000).unwrap();

    assert!(summary.finished);
    assert!(summary.locks.is_empty());
    assert_eq!(summary.committed, vec![400]);
    let stats = sim.into_stats();
    assert_eq!(stats[0].committed, 400);
}
