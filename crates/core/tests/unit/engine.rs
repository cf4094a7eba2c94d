//! Pipeline Engine Tests.
//!
//! Drives one engine against the trace source, the fixed-latency cluster and
//! the reference memory, and checks commit order, structural limits and the
//! rename stall causes each limit produces.

use ooosim_core::common::{FlowId, NUM_ARCH_REGS, SeqId, SimError};
use ooosim_core::config::{PredictorKind, SimConfig};
use ooosim_core::core::OooProcessor;
use ooosim_core::core::pipeline::traits::StallCause;
use ooosim_core::isa::OpClass;
use ooosim_core::sim::{FixedLatencyCluster, SimpleMemory, TraceSource};
use ooosim_core::stats::NullStats;
use pretty_assertions::assert_eq;

use crate::common::{ProgramBuilder, Rig};

/// One integer divide on register 1 followed by `n` independent ALU operations.
fn divide_then_independent(n: usize) -> ProgramBuilder {
    let mut b = ProgramBuilder::default().op(OpClass::IntDiv, 1, 9, 0);
    for i in 0..n {
        b = b.alu(2 + (i % 6) as u8, 9, 0);
    }
    b
}

// ══════════════════════════════════════════════════════════
// 1. Straight-line execution
// ══════════════════════════════════════════════════════════

#[test]
fn straight_line_commits_everything_in_order() {
    let mut rig = Rig::new(&SimConfig::default(), ProgramBuilder::straight_line(200));
    let _ = rig.run(5_000);

    assert_eq!(rig.core.committed(), 200);
    assert_eq!(rig.committed_ids(), (0..200).collect::<Vec<_>>());
    assert_eq!(rig.stats().committed, 200);
    assert_eq!(rig.stats().fetched, 200);
    assert_eq!(rig.core.in_flight(), 0);
    assert_eq!(rig.core.rat().live_producers(), 0);
    assert_eq!(rig.core.register_budget().in_use(), 0);
    assert_eq!(rig.source.remaining(FlowId(0)), 0);
}

#[test]
fn commit_rate_never_exceeds_retire_width() {
    let mut config = SimConfig::default();
    config.pipeline.retire_width = 2;
    let mut rig = Rig::new(&config, ProgramBuilder::straight_line(120));
    let mut before = 0;
    while rig.tick() {
        let now = rig.core.committed();
        assert!(now - before <= 2, "committed {} in one cycle", now - before);
        before = now;
    }
    assert_eq!(rig.core.committed(), 120);
    assert!(rig.stats().ipc() <= 2.0);
}

#[test]
fn empty_source_is_idle_immediately() {
    let mut rig = Rig::new(&SimConfig::default(), Vec::new());
    assert!(!rig.tick());
    assert_eq!(rig.stats().cycles, 0);
}

#[test]
fn dependent_chain_commits_after_producers() {
    let program = ProgramBuilder::default()
        .op(OpClass::IntMult, 1, 9, 0)
        .alu(2, 1, 0)
        .alu(3, 2, 1)
        .op(OpClass::FpDiv, 40, 3, 0)
        .alu(4, 9, 0)
        .build();
    let mut rig = Rig::new(&SimConfig::default(), program);
    let _ = rig.run(1_000);
    assert_eq!(rig.committed_ids(), vec![0, 1, 2, 3, 4]);
}

/// A source that names a register beyond the rename tables ends the run
/// with an error instead of corrupting the alias table.
#[test]
fn register_outside_rename_tables_is_fatal() {
    let config = SimConfig::default();
    let program = ProgramBuilder::default().alu(1, 9, 0).alu(2, 9, 0).alu(70, 9, 0).alu(3, 9, 0).build();
    let mut source = TraceSource::new(vec![program]);
    let mut memory = SimpleMemory::new(&config.memory);
    let mut core = OooProcessor::new(FlowId(0), &config, FixedLatencyCluster::new(&config.cluster), NullStats).unwrap();

    let mut result = Ok(true);
    for now in 0..10 {
        result = core.advance_clock(now, &mut source, &mut memory);
        if result.is_err() {
            break;
        }
    }
    assert_eq!(
        result,
        Err(SimError::RegisterOutOfRange {
            flow: FlowId(0),
            id: SeqId(2),
            pc: 0x1008,
            reg: 70,
            limit: NUM_ARCH_REGS,
        })
    );
}

#[test]
fn source_register_outside_rename_tables_is_fatal() {
    let config = SimConfig::default();
    let program = ProgramBuilder::default().alu(1, 200, 0).build();
    let mut source = TraceSource::new(vec![program]);
    let mut memory = SimpleMemory::new(&config.memory);
    let mut core = OooProcessor::new(FlowId(0), &config, FixedLatencyCluster::new(&config.cluster), NullStats).unwrap();
    assert!(matches!(
        core.advance_clock(0, &mut source, &mut memory),
        Err(SimError::RegisterOutOfRange { reg: 200, .. })
    ));
}

// ══════════════════════════════════════════════════════════
// 2. Structural limits
// ══════════════════════════════════════════════════════════

/// A ROB of four entries refuses a fifth instruction with a ROB-full stall.
#[test]
fn rob_capacity_four_stalls_rename() {
    let mut config = SimConfig::default();
    config.pipeline.max_rob_size = 4;
    let mut rig = Rig::new(&config, divide_then_independent(30).build());
    while rig.tick() {
        let used = rig.core.rob_len() + rig.core.retire_queue_len();
        assert!(used <= 4, "ROB and retire queue hold {used} entries");
    }
    assert!(rig.stats().stalls_for(StallCause::RobFull) > 0);
    assert_eq!(rig.core.committed(), 31);
}

/// The stall cause is visible on the engine even when statistics are discarded.
#[test]
fn rename_stall_cause_is_reported_without_stats() {
    let mut config = SimConfig::default();
    config.pipeline.max_rob_size = 4;
    let mut source = TraceSource::new(vec![divide_then_independent(30).build()]);
    let mut memory = SimpleMemory::new(&config.memory);
    let mut core = OooProcessor::new(FlowId(0), &config, FixedLatencyCluster::new(&config.cluster), NullStats).unwrap();

    let mut causes = Vec::new();
    let mut now = 0;
    while core.advance_clock(now, &mut source, &mut memory).unwrap() {
        causes.extend(core.last_stall());
        now += 1;
        assert!(now < 2_000, "engine never drained");
    }
    assert!(causes.contains(&StallCause::RobFull));
    assert_eq!(core.last_stall(), None);
    assert_eq!(core.committed(), 31);
}

#[test]
fn register_budget_bounds_renamed_writers() {
    let mut config = SimConfig::default();
    config.pipeline.total_regs = 2;
    let mut rig = Rig::new(&config, divide_then_independent(20).build());
    while rig.tick() {
        assert!(rig.core.register_budget().in_use() <= 2);
    }
    assert!(rig.stats().stalls_for(StallCause::RegistersExhausted) > 0);
    assert_eq!(rig.core.committed(), 21);
    assert_eq!(rig.core.register_budget().in_use(), 0);
}

#[test]
fn full_window_stalls_rename() {
    let mut config = SimConfig::default();
    config.cluster.window_size = 2;
    // Everything waits on the divide, so nothing leaves the window early.
    let mut b = ProgramBuilder::default().op(OpClass::IntDiv, 1, 9, 0);
    for _ in 0..10 {
        b = b.alu(1, 1, 0);
    }
    let mut rig = Rig::new(&config, b.build());
    let _ = rig.run(2_000);
    assert!(rig.stats().stalls_for(StallCause::WindowFull) > 0);
    assert_eq!(rig.core.committed(), 11);
}

#[test]
fn full_lsq_stalls_rename() {
    let mut config = SimConfig::default();
    config.cluster.lsq_size = 1;
    let mut b = ProgramBuilder::default();
    for i in 0..8 {
        b = b.load(2 + i, 9, 0x1000 + 64 * u64::from(i));
    }
    let mut rig = Rig::new(&config, b.build());
    let _ = rig.run(2_000);
    assert!(rig.stats().stalls_for(StallCause::LsqFull) > 0);
    assert_eq!(rig.core.committed(), 8);
    assert_eq!(rig.core.cluster().lsq_used(), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Control flow
// ══════════════════════════════════════════════════════════

#[test]
fn mispredicted_loop_still_commits_in_order() {
    let mut config = SimConfig::default();
    config.bpred.pred1 = PredictorKind::NotTaken;
    let program = ProgramBuilder::default().counted_loop(20, |b| b.alu(1, 9, 0).alu(2, 1, 0)).build();
    let total = program.len() as u64;
    let mut rig = Rig::new(&config, program);
    let _ = rig.run(10_000);

    assert_eq!(rig.core.committed(), total);
    assert_eq!(rig.committed_ids(), (0..total).collect::<Vec<_>>());
    // 19 taken back-edges against an always-not-taken predictor.
    assert_eq!(rig.stats().branch_misses, 19);
    assert_eq!(rig.core.branch_unit().mispredicts(), 19);
}

#[test]
fn learned_loop_mispredicts_less_than_static() {
    let program = || ProgramBuilder::default().counted_loop(64, |b| b.alu(1, 9, 0)).build();

    let mut static_cfg = SimConfig::default();
    static_cfg.bpred.pred1 = PredictorKind::NotTaken;
    let mut static_rig = Rig::new(&static_cfg, program());
    let _ = static_rig.run(20_000);

    let mut learned_cfg = SimConfig::default();
    learned_cfg.bpred.pred1 = PredictorKind::TwoBit;
    let mut learned_rig = Rig::new(&learned_cfg, program());
    let _ = learned_rig.run(20_000);

    assert!(learned_rig.stats().branch_misses < static_rig.stats().branch_misses);
    assert!(learned_rig.stats().cycles < static_rig.stats().cycles);
}

// ══════════════════════════════════════════════════════════
// 4. Memory
// ══════════════════════════════════════════════════════════

#[test]
fn stores_commit_to_source_only_when_visible() {
    let program = ProgramBuilder::default()
        .store(9, 9, 0x400)
        .alu(1, 9, 0)
        .alu(2, 9, 0)
        .build();
    let mut rig = Rig::new(&SimConfig::default(), program);
    let _ = rig.run(1_000);

    assert_eq!(rig.source.reexecuted(FlowId(0)), &[SeqId(0)]);
    // The store drains after the younger ALU operations committed.
    assert_eq!(rig.committed_ids(), vec![1, 2, 0]);
    assert_eq!(rig.core.pending_stores(), 0);
}
