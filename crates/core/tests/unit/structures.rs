//! Pipeline Structure Properties.
//!
//! Property tests for the ROB, the retire queue and the rename register
//! budget, plus the fixed ROB-capacity scenario.

use std::sync::Arc;

use ooosim_core::common::{FlowId, SeqId, SimError};
use ooosim_core::core::dinst::{DInst, DInstPool, InstHandle};
use ooosim_core::core::pipeline::budget::RegisterBudget;
use ooosim_core::core::pipeline::rob::{RetireQueue, Rob, RobEntry};
use ooosim_core::isa::{FetchedInst, OpClass, RegOperands, StaticInst};
use proptest::prelude::*;

fn alloc(pool: &mut DInstPool, id: u64) -> InstHandle {
    let inst = Arc::new(StaticInst::new(0x100 + id * 4, OpClass::IntAlu, RegOperands::default()));
    pool.alloc(DInst::new(SeqId(id), FlowId(0), FetchedInst::new(inst, 0x104 + id * 4, None), 0))
}

#[test]
fn rob_of_four_refuses_a_fifth_entry() {
    let mut pool = DInstPool::new();
    let mut rob = Rob::new(4);
    for id in 0..4 {
        let h = alloc(&mut pool, id);
        assert!(rob.push(h, SeqId(id)));
    }
    let fifth = alloc(&mut pool, 4);
    assert!(rob.is_full());
    assert!(!rob.push(fifth, SeqId(4)));
    assert_eq!(rob.len(), 4);
    assert_eq!(rob.find(SeqId(4)), None);
}

#[test]
fn retire_queue_rejects_out_of_order_entries() {
    let mut pool = DInstPool::new();
    let mut rrob = RetireQueue::new();
    let a = alloc(&mut pool, 7);
    let b = alloc(&mut pool, 3);
    rrob.push(RobEntry { handle: a, id: SeqId(7) }).unwrap();
    assert!(matches!(
        rrob.push(RobEntry { handle: b, id: SeqId(3) }),
        Err(SimError::OrderViolation { .. })
    ));
}

proptest! {
    /// Whatever the interleaving of pushes and pops, the ROB hands entries
    /// back in insertion order and never holds more than its capacity.
    #[test]
    fn rob_preserves_program_order(capacity in 1usize..16, ops in prop::collection::vec(any::<bool>(), 1..200)) {
        let mut pool = DInstPool::new();
        let mut rob = Rob::new(capacity);
        let mut next = 0u64;
        let mut expected = 0u64;
        for push in ops {
            if push {
                let h = alloc(&mut pool, next);
                if rob.push(h, SeqId(next)) {
                    next += 1;
                } else {
                    prop_assert_eq!(rob.len(), capacity);
                    let _ = pool.free(h);
                }
            } else if let Some(entry) = rob.pop_head() {
                prop_assert_eq!(entry.id, SeqId(expected));
                expected += 1;
            }
            prop_assert!(rob.len() <= capacity);
            let ids: Vec<u64> = rob.iter().map(|e| e.id.0).collect();
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }
    }

    /// Charges never exceed the limit and every charge is matched by one release.
    #[test]
    fn register_budget_is_conserved(total in 1usize..32, ops in prop::collection::vec(any::<bool>(), 1..300)) {
        let mut budget = RegisterBudget::new(total);
        let mut held = 0usize;
        for charge in ops {
            if charge {
                if budget.charge() {
                    held += 1;
                } else {
                    prop_assert_eq!(held, total);
                }
            } else if held > 0 {
                prop_assert!(budget.release().is_ok());
                held -= 1;
            } else {
                let underflow = matches!(budget.release(), Err(SimError::RegisterUnderflow { .. }));
                prop_assert!(underflow);
            }
            prop_assert_eq!(budget.in_use(), held);
            prop_assert_eq!(budget.available(), Some(total - held));
        }
    }
}
