//! Branch Predictor Tests.
//!
//! Exercises every algorithm of the predictor family through the common
//! `BPred` level interface and the composite unit the front-end consults.
//! Saturating counter behaviour is checked with property tests.

use ooosim_core::common::RegId;
use ooosim_core::config::{BranchPredictorConfig, PredictorKind};
use ooosim_core::core::units::bru::composite::BranchUnit;
use ooosim_core::core::units::bru::sc_table::SCTable;
use ooosim_core::core::units::bru::{BPred, BranchInfo, PredType};
use ooosim_core::isa::{OpClass, RegOperands, StaticInst};
use ooosim_core::stats::CoreStats;
use proptest::prelude::*;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════

fn conditional(pc: u64, taken: bool) -> BranchInfo {
    let inst = StaticInst::new(pc, OpClass::Branch, RegOperands::new(RegId(3), RegId::ZERO, RegId::ZERO));
    let next = if taken { pc - 0x40 } else { pc + 4 };
    BranchInfo::new(&inst, next, true).unwrap()
}

fn level(kind: PredictorKind) -> BPred {
    BPred::new(kind, &BranchPredictorConfig::default())
}

// ══════════════════════════════════════════════════════════
// 1. Counter tables
// ══════════════════════════════════════════════════════════

/// A 2-bit counter starting weakly not-taken predicts taken on the fourth
/// lookup after three taken outcomes.
#[test]
fn two_bit_counter_predicts_taken_after_three_takens() {
    let mut table = SCTable::new(1024, 2);
    assert!(!table.predict(0x40));
    for _ in 0..3 {
        let _ = table.predict_update(0x40, true);
    }
    assert!(table.predict(0x40));
    assert_eq!(table.counter(0x40), 3);
}

#[test]
fn two_bit_level_scores_fourth_lookup_correct() {
    let mut p = level(PredictorKind::TwoBit);
    let br = conditional(0x2000, true);
    for _ in 0..3 {
        let _ = p.do_predict(&br, true);
    }
    assert_eq!(p.do_predict(&br, true), PredType::CorrectPrediction);
}

proptest! {
    /// Updating never moves a counter outside `0..=max`, and a repeated
    /// outcome moves it by at most one step per update.
    #[test]
    fn counters_saturate(bits in 1u8..=7, outcomes in prop::collection::vec(any::<bool>(), 1..200)) {
        let mut table = SCTable::new(16, bits);
        let max = table.max();
        for taken in outcomes {
            let before = table.counter(5);
            table.update(5, taken);
            table.update(5, taken);
            let after = table.counter(5);
            prop_assert!(after <= max);
            prop_assert!(before.abs_diff(after) <= 2);
            if taken {
                prop_assert!(after >= before);
            } else {
                prop_assert!(after <= before);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════
// 2. Algorithms
// ══════════════════════════════════════════════════════════

/// Every learning algorithm settles on an always-taken branch.
#[rstest]
#[case::oracle(PredictorKind::Oracle)]
#[case::taken(PredictorKind::Taken)]
#[case::two_bit(PredictorKind::TwoBit)]
#[case::two_level(PredictorKind::TwoLevel)]
#[case::hybrid(PredictorKind::Hybrid)]
#[case::skew(PredictorKind::TwoBcgSkew)]
#[case::yags(PredictorKind::Yags)]
#[case::ogehl(PredictorKind::Ogehl)]
#[case::loop_table(PredictorKind::Loop)]
#[case::btb(PredictorKind::Btb)]
fn learns_always_taken_branch(#[case] kind: PredictorKind) {
    let mut p = level(kind);
    let br = conditional(0x4400, true);
    for _ in 0..64 {
        let _ = p.do_predict(&br, true);
    }
    for _ in 0..16 {
        assert_eq!(p.do_predict(&br, true), PredType::CorrectPrediction, "{kind:?}");
    }
}

/// Every learning algorithm settles on an always-not-taken branch.
#[rstest]
#[case::oracle(PredictorKind::Oracle)]
#[case::not_taken(PredictorKind::NotTaken)]
#[case::two_bit(PredictorKind::TwoBit)]
#[case::two_level(PredictorKind::TwoLevel)]
#[case::hybrid(PredictorKind::Hybrid)]
#[case::skew(PredictorKind::TwoBcgSkew)]
#[case::yags(PredictorKind::Yags)]
#[case::ogehl(PredictorKind::Ogehl)]
#[case::loop_table(PredictorKind::Loop)]
fn learns_never_taken_branch(#[case] kind: PredictorKind) {
    let mut p = level(kind);
    let br = conditional(0x4800, false);
    for _ in 0..64 {
        let _ = p.do_predict(&br, true);
    }
    for _ in 0..16 {
        assert_eq!(p.do_predict(&br, true), PredType::CorrectPrediction, "{kind:?}");
    }
}

#[rstest]
#[case(PredictorKind::Taken, false)]
#[case(PredictorKind::NotTaken, true)]
#[case(PredictorKind::Miss, false)]
#[case(PredictorKind::Miss, true)]
fn static_predictors_miss_the_other_direction(#[case] kind: PredictorKind, #[case] taken: bool) {
    let mut p = level(kind);
    let br = conditional(0x5000, taken);
    let _ = p.do_predict(&br, true);
    assert_eq!(p.do_predict(&br, true), PredType::MissPrediction);
    assert_eq!(p.misses(), 2);
}

#[test]
fn local_history_learns_alternating_pattern() {
    let mut p = level(PredictorKind::TwoLevel);
    let mut late_misses = 0;
    for i in 0..400 {
        let outcome = p.do_predict(&conditional(0x6000, i % 2 == 0), true);
        if i >= 300 && outcome != PredType::CorrectPrediction {
            late_misses += 1;
        }
    }
    assert_eq!(late_misses, 0);
}

#[test]
fn unscored_branches_leave_counters_alone() {
    let mut p = level(PredictorKind::NotTaken);
    let mut br = conditional(0x7000, true);
    br.stats = false;
    let _ = p.do_predict(&br, true);
    assert_eq!((p.hits(), p.misses()), (0, 0));
}

// ══════════════════════════════════════════════════════════
// 3. Composite unit
// ══════════════════════════════════════════════════════════

#[test]
fn composite_reports_misses_to_stats() {
    let config = BranchPredictorConfig {
        pred1: PredictorKind::NotTaken,
        ..BranchPredictorConfig::default()
    };
    let mut unit = BranchUnit::new(&config);
    let mut stats = CoreStats::default();
    for i in 0..10 {
        let _ = unit.predict(&conditional(0x8000, i % 2 == 0), &mut stats);
    }
    assert_eq!(stats.branch_misses, 5);
    assert_eq!(stats.branch_hits, 5);
    assert_eq!(unit.branches(), 10);
    assert_eq!(unit.taken(), 5);
    assert!((stats.branch_accuracy() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn second_level_overrides_and_costs_its_delay() {
    let config = BranchPredictorConfig {
        pred1: PredictorKind::NotTaken,
        pred2: Some(PredictorKind::TwoBit),
        ..BranchPredictorConfig::default()
    };
    let mut unit = BranchUnit::new(&config);
    let mut stats = CoreStats::default();
    let br = conditional(0x9000, true);
    for _ in 0..8 {
        let _ = unit.predict(&br, &mut stats);
    }
    let p = unit.predict(&br, &mut stats);
    assert_eq!(p.outcome, PredType::CorrectPrediction);
    assert_eq!(p.delay, config.bpred_delay2);
    assert!(stats.branch_fixes > 0);
}
