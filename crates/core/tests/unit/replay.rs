//! Replay and Serialization Tests.
//!
//! Checks the recovery sequence of a memory-ordering replay: marking, the
//! drain and flush from the marked instruction, the rewind of the source,
//! and the serialization level changes that follow.

use ooosim_core::common::{FlowId, SeqId};
use ooosim_core::config::SimConfig;
use ooosim_core::core::pipeline::replay::{ReplayDecision, SerializeLevel};
use ooosim_core::isa::{FetchedInst, OpClass};
use ooosim_core::stats::Average;
use pretty_assertions::assert_eq;

use crate::common::{ProgramBuilder, Rig};

/// `n` independent instructions with a chain of three divides at 93..=95
/// that keeps everything from 93 on in the ROB for a while.
fn blocked_at_93(n: usize) -> Vec<FetchedInst> {
    let mut b = ProgramBuilder::default();
    for i in 0..n {
        b = if (93..=95).contains(&i) {
            b.op(OpClass::IntDiv, 1, 1, 0)
        } else {
            b.alu(2 + (i % 6) as u8, 9, 0)
        };
    }
    b.build()
}

/// Runs until ids up to 110 are renamed while 95 has not committed, then
/// requests a replay at 100.
fn replay_at_100(config: &SimConfig, n: usize) -> Rig {
    let mut rig = Rig::new(config, blocked_at_93(n));
    rig.run_until(2_000, |r| r.core.next_id().0 > 120);
    for _ in 0..6 {
        let _ = rig.tick();
    }
    assert!(rig.core.committed() < 95, "the divide chain should still be in flight");
    assert_eq!(rig.core.replay(SeqId(100)), Some(ReplayDecision::Started));
    rig
}

#[test]
fn replay_resumes_fetch_at_flush_point() {
    let mut rig = replay_at_100(&SimConfig::default(), 300);
    assert!(rig.core.replay_controller().is_recovering());

    rig.run_until(2_000, |r| !r.source.resyncs(FlowId(0)).is_empty());
    assert_eq!(rig.source.resyncs(FlowId(0)), &[SeqId(100)]);
    // Nothing at or after the flush point was committed before the rewind.
    assert!(rig.committed_ids().iter().all(|&id| id < 100));
    assert_eq!(rig.core.next_id(), SeqId(100));

    let _ = rig.run(5_000);
    assert_eq!(rig.committed_ids(), (0..300).collect::<Vec<_>>());
    assert_eq!(rig.stats().replays, 1);
    assert!(rig.stats().flushed >= 11, "ids 100..=110 were flushed");
}

#[test]
fn close_replay_escalates_then_quiet_interval_relaxes() {
    let mut rig = replay_at_100(&SimConfig::default(), 600);
    rig.run_until(2_000, |r| !r.core.replay_controller().is_recovering());

    // Replay at 100 is within the 200-instruction threshold of the start.
    assert_eq!(rig.core.replay_controller().level(), SerializeLevel::StoreOrdered);
    assert_eq!(rig.stats().serialize_escalations, 1);

    let _ = rig.run(10_000);
    // Committing id 500 (100 + 2 * 200) relaxes one step.
    assert_eq!(rig.stats().serialize_relaxations, 1);
    assert_eq!(rig.core.replay_controller().level(), SerializeLevel::SameRegister);
    assert_eq!(rig.core.committed(), 600);
}

#[test]
fn replay_inside_serialization_window_is_suppressed() {
    let mut rig = replay_at_100(&SimConfig::default(), 300);
    rig.run_until(2_000, |r| !r.core.replay_controller().is_recovering());
    assert!(rig.core.replay_controller().serialize_for() > 0);

    let mut decision = None;
    rig.run_until(200, |r| {
        decision = r.core.replay(SeqId(100));
        decision.is_some()
    });
    assert_eq!(decision, Some(ReplayDecision::Suppressed));

    let _ = rig.run(5_000);
    assert_eq!(rig.stats().replays, 1);
    assert_eq!(rig.source.resyncs(FlowId(0)).len(), 1);
}

#[test]
fn disabled_replay_leaves_pipeline_untouched() {
    let mut config = SimConfig::default();
    config.pipeline.memory_replay = false;
    let mut rig = Rig::new(&config, blocked_at_93(200));
    rig.run_until(2_000, |r| r.core.next_id().0 > 120);
    for _ in 0..6 {
        let _ = rig.tick();
    }
    assert_eq!(rig.core.replay(SeqId(100)), Some(ReplayDecision::Disabled));

    let _ = rig.run(5_000);
    assert_eq!(rig.stats().replays, 0);
    assert_eq!(rig.stats().flushed, 0);
    assert!(rig.source.resyncs(FlowId(0)).is_empty());
    assert_eq!(rig.core.committed(), 200);
}

#[test]
fn replay_for_unknown_instruction_is_ignored() {
    let mut rig = Rig::new(&SimConfig::default(), ProgramBuilder::straight_line(10));
    let _ = rig.tick();
    assert_eq!(rig.core.replay(SeqId(5_000)), None);
    assert!(!rig.core.replay_controller().is_recovering());
}

/// A store whose address depends on a divide executes after a younger load
/// to the same address; the memory model reports the load as stale.
#[test]
fn stale_load_from_memory_model_replays_at_the_load() {
    let program = ProgramBuilder::default()
        .op(OpClass::IntDiv, 1, 9, 0)
        .store(1, 9, 0x100)
        .load(4, 2, 0x100)
        .alu(5, 4, 0)
        .alu(6, 5, 0)
        .build();
    let mut rig = Rig::new(&SimConfig::default(), program);
    let _ = rig.run(2_000);

    assert_eq!(rig.memory.stale_loads(), 1);
    assert_eq!(rig.stats().replays, 1);
    assert_eq!(rig.source.resyncs(FlowId(0)), &[SeqId(2)]);
    assert_eq!(rig.source.reexecuted(FlowId(0)), &[SeqId(1)]);

    let mut ids = rig.committed_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[test]
fn injected_stale_load_flushes_younger_work() {
    let mut rig = Rig::new(&SimConfig::default(), blocked_at_93(150));
    rig.run_until(2_000, |r| r.core.next_id().0 > 130);
    let at = rig.now;
    rig.memory.inject_stale_load(FlowId(0), SeqId(96), at);
    let _ = rig.run(5_000);

    assert_eq!(rig.source.resyncs(FlowId(0)), &[SeqId(96)]);
    assert_eq!(rig.committed_ids(), (0..150).collect::<Vec<_>>());
    assert_eq!(rig.stats().average(Average::ReplayWasted).samples, 1);
}
