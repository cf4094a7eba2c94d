use mockall::mock;
use ooosim_core::common::{Cycle, FlowId, SeqId};
use ooosim_core::core::dinst::{DInst, ResourceId};
use ooosim_core::core::pipeline::traits::{Cluster, InstructionSource, MemoryEvent, MemorySystem, StallCause};
use ooosim_core::core::units::ldbp::PrefetchTrigger;
use ooosim_core::isa::FetchedInst;

mock! {
    pub ExecCluster {}
    impl Cluster for ExecCluster {
        fn can_issue(&mut self, dinst: &DInst) -> Result<ResourceId, StallCause>;
        fn add_inst(&mut self, dinst: &DInst);
        fn schedule(&mut self, dinst: &DInst, now: Cycle) -> Option<Cycle>;
        fn preretire(&mut self, dinst: &DInst, flushing: bool) -> bool;
        fn retire(&mut self, dinst: &DInst, flushing: bool) -> bool;
    }
}

mock! {
    pub MemSystem {}
    impl MemorySystem for MemSystem {
        fn load_latency(&mut self, dinst: &DInst, now: Cycle) -> Cycle;
        fn executed(&mut self, dinst: &DInst, now: Cycle);
        fn retired(&mut self, dinst: &DInst, now: Cycle);
        fn squashed(&mut self, flow: FlowId, id: SeqId);
        fn poll(&mut self, flow: FlowId, now: Cycle, events: &mut Vec<MemoryEvent>);
        fn prefetch(&mut self, trigger: &PrefetchTrigger);
    }
}

mock! {
    pub InstSource {}
    impl InstructionSource for InstSource {
        fn fetch(&mut self, flow: FlowId) -> Option<FetchedInst>;
        fn commit(&mut self, flow: FlowId, id: SeqId);
        fn reexecute_tail(&mut self, flow: FlowId, id: SeqId);
        fn sync_head_tail(&mut self, flow: FlowId, resume: SeqId);
    }
}

/// A cluster that accepts and schedules everything with latency 1.
///
/// `retires` decides whether commit is ever allowed.
pub fn permissive_cluster(retires: bool) -> MockExecCluster {
    let mut c = MockExecCluster::new();
    c.expect_can_issue().returning(|_| Ok(ResourceId(0)));
    c.expect_add_inst().return_const(());
    c.expect_schedule().returning(|_, _| Some(1));
    c.expect_preretire().returning(|_, _| true);
    c.expect_retire().returning(move |_, _| retires);
    c
}
