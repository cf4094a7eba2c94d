//! Collaborator Contract Tests.
//!
//! Uses `mockall` doubles of the instruction source, cluster and memory
//! system to pin down exactly which calls the engine makes, and in what order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mockall::Sequence;
use mockall::predicate::{always, eq};
use ooosim_core::common::{FlowId, SeqId};
use ooosim_core::config::SimConfig;
use ooosim_core::core::OooProcessor;
use ooosim_core::core::dinst::ResourceId;
use ooosim_core::core::pipeline::traits::{MemoryEvent, StallCause};
use ooosim_core::core::pipeline::replay::ReplayDecision;
use ooosim_core::isa::{FetchedInst, OpClass};
use ooosim_core::sim::{FixedLatencyCluster, TraceSource};
use ooosim_core::stats::{CoreStats, NullStats};

use crate::common::mocks::{MockExecCluster, MockInstSource, MockMemSystem, permissive_cluster};
use crate::common::{ProgramBuilder, Rig, init_tracing};

/// A source that hands out `program` once, in order.
fn scripted_source(program: Vec<FetchedInst>) -> MockInstSource {
    let mut queue = program;
    queue.reverse();
    let mut source = MockInstSource::new();
    source.expect_fetch().with(eq(FlowId(0))).returning(move |_| queue.pop());
    source
}

#[test]
fn store_commits_to_source_after_visibility() {
    init_tracing();
    let program = ProgramBuilder::default().store(9, 9, 0x80).build();

    let mut seq = Sequence::new();
    let mut source = scripted_source(program);
    source
        .expect_reexecute_tail()
        .with(eq(FlowId(0)), eq(SeqId(0)))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    source
        .expect_commit()
        .with(eq(FlowId(0)), eq(SeqId(0)))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    source.expect_sync_head_tail().never();

    let drained = Arc::new(AtomicBool::new(false));
    let visible = Arc::clone(&drained);
    let mut memory = MockMemSystem::new();
    memory.expect_load_latency().never();
    memory.expect_executed().times(1).return_const(());
    memory
        .expect_retired()
        .times(1)
        .returning(move |_, _| drained.store(true, Ordering::SeqCst));
    memory.expect_squashed().never();
    memory.expect_prefetch().never();
    memory.expect_poll().with(eq(FlowId(0)), always(), always()).returning(move |_, _, events| {
        if visible.swap(false, Ordering::SeqCst) {
            events.push(MemoryEvent::StoreVisible(SeqId(0)));
        }
    });

    let mut core = OooProcessor::new(FlowId(0), &SimConfig::default(), permissive_cluster(true), NullStats).unwrap();
    let mut now = 0;
    while core.advance_clock(now, &mut source, &mut memory).unwrap() {
        now += 1;
        assert!(now < 200, "store never drained");
    }
    assert_eq!(core.committed(), 1);
    assert_eq!(core.pending_stores(), 0);
}

#[test]
fn loads_ask_memory_for_latency() {
    init_tracing();
    let program = ProgramBuilder::default().load(3, 9, 0x40).build();
    let mut source = scripted_source(program);
    source.expect_commit().times(1).return_const(());

    let mut memory = MockMemSystem::new();
    memory.expect_load_latency().times(1).return_const(7_u64);
    memory.expect_executed().times(1).return_const(());
    memory.expect_retired().times(1).return_const(());
    memory.expect_poll().return_const(());

    let mut core = OooProcessor::new(FlowId(0), &SimConfig::default(), permissive_cluster(true), CoreStats::default())
        .unwrap();
    let mut now = 0;
    let mut committed_at = None;
    while core.advance_clock(now, &mut source, &mut memory).unwrap() {
        if committed_at.is_none() && core.committed() == 1 {
            committed_at = Some(now);
        }
        now += 1;
    }
    // Decode, one cycle of cluster latency, seven of memory, then the retire delay.
    assert!(committed_at.is_some_and(|t| t >= 3 + 1 + 7 + 2));
}

#[test]
fn cluster_stall_cause_is_counted_and_retried() {
    init_tracing();
    let mut cluster = MockExecCluster::new();
    let mut refusals = 3;
    cluster.expect_can_issue().returning(move |_| {
        if refusals > 0 {
            refusals -= 1;
            Err(StallCause::StoreBufferFull)
        } else {
            Ok(ResourceId(4))
        }
    });
    cluster.expect_add_inst().times(2).return_const(());
    cluster.expect_schedule().returning(|_, _| Some(1));
    cluster.expect_preretire().returning(|_, _| true);
    cluster.expect_retire().with(always(), eq(false)).times(2).return_const(true);

    let mut rig = Rig::with_cluster(&SimConfig::default(), cluster, ProgramBuilder::straight_line(2));
    rig.run_until(500, |r| r.core.last_stall().is_some());
    assert_eq!(rig.core.last_stall(), Some(StallCause::StoreBufferFull));
    let _ = rig.run(500);
    assert_eq!(rig.stats().stalls_for(StallCause::StoreBufferFull), 3);
    assert_eq!(rig.core.committed(), 2);
}

#[test]
fn unscheduled_instruction_never_retires() {
    init_tracing();
    let mut cluster = MockExecCluster::new();
    cluster.expect_can_issue().returning(|_| Ok(ResourceId(0)));
    cluster.expect_add_inst().return_const(());
    cluster.expect_schedule().returning(|_, _| None);
    cluster.expect_preretire().never();
    cluster.expect_retire().never();

    let mut rig = Rig::with_cluster(&SimConfig::default(), cluster, ProgramBuilder::straight_line(3));
    for _ in 0..50 {
        assert!(rig.tick());
    }
    assert_eq!(rig.core.committed(), 0);
    assert_eq!(rig.core.rob_len(), 3);
}

#[test]
fn flushed_memory_operations_are_squashed() {
    init_tracing();
    let mut b = ProgramBuilder::default().op(OpClass::IntDiv, 1, 9, 0);
    for i in 0..6 {
        b = b.load(2 + i, 9, 0x200 + 8 * u64::from(i));
    }
    let mut source = TraceSource::new(vec![b.build()]);

    let mut memory = MockMemSystem::new();
    memory.expect_load_latency().return_const(2_u64);
    memory.expect_executed().return_const(());
    memory.expect_retired().times(6).return_const(());
    memory.expect_poll().return_const(());
    for id in 1..=6 {
        memory
            .expect_squashed()
            .with(eq(FlowId(0)), eq(SeqId(id)))
            .times(1)
            .return_const(());
    }

    let config = SimConfig::default();
    let cluster = FixedLatencyCluster::new(&config.cluster);
    let mut core = OooProcessor::new(FlowId(0), &config, cluster, NullStats).unwrap();
    let mut now = 0;
    // The divide holds commit while the loads execute.
    while now < 12 {
        let _ = core.advance_clock(now, &mut source, &mut memory).unwrap();
        now += 1;
    }
    assert_eq!(core.replay(SeqId(1)), Some(ReplayDecision::Started));
    while core.advance_clock(now, &mut source, &mut memory).unwrap() {
        now += 1;
        assert!(now < 1_000, "replay never finished");
    }

    assert_eq!(source.resyncs(FlowId(0)), &[SeqId(1)]);
    assert_eq!(core.committed(), 7);
}
