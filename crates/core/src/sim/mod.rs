//! Reference collaborators and the simulation driver.
//!
//! The pipeline engine only sees its collaborators through traits. This
//! module supplies simple implementations of them plus the loop that runs
//! several engines on one clock.

/// Fixed-latency execution cluster.
pub mod cluster;
/// Fixed-latency memory model with stale-load detection.
pub mod memory;
/// Multi-flow driver with lock checks.
pub mod simulator;
/// Trace-driven instruction source.
pub mod trace;

pub use cluster::FixedLatencyCluster;
pub use memory::SimpleMemory;
pub use simulator::{RunSummary, Simulator};
pub use trace::TraceSource;
