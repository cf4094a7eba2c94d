//! Out-of-order processor timing core.
//!
//! This crate models the timing of a superscalar out-of-order core fed by a
//! functional instruction source. It provides:
//! 1. **Pipeline:** Fetch, decode, rename, execute and two-stage retirement per hardware thread.
//! 2. **Speculation Recovery:** Memory-ordering replays with adaptive serialization.
//! 3. **Branch Prediction:** A configurable multi-level predictor family with BTB and RAS.
//! 4. **Prefetch:** An optional load-branch correlation prefetcher.
//! 5. **Simulation:** Reference collaborators, a multi-flow driver and statistics.

/// Common identifiers and error types.
pub mod common;
/// Simulator configuration (defaults, predictor selection, structure sizes).
pub mod config;
/// Timing core (dynamic instructions, pipeline engine, predictor units).
pub mod core;
/// Decoded instruction templates.
pub mod isa;
/// Trace source, reference cluster and memory, and the simulation driver.
pub mod sim;
/// Statistics counters and reporting.
pub mod stats;

/// Root configuration type; use `SimConfig::default()` or load it from JSON.
pub use crate::config::SimConfig;
/// Pipeline engine of one hardware thread.
pub use crate::core::OooProcessor;
/// Multi-flow simulation driver.
pub use crate::sim::Simulator;
/// Counter-based statistics sink.
pub use crate::stats::CoreStats;
