//! Out-of-order instruction pipeline.
//!
//! This module contains the structures one hardware thread needs between fetch
//! and commit. It includes the following components:
//! 1. **Front-End:** Decode pipe, instruction queue and fetch gating.
//! 2. **Rename:** Register alias table and register budget.
//! 3. **Reorder:** ROB and retire queue.
//! 4. **Replay:** Memory-ordering recovery and serialization.
//! 5. **Engine:** The per-cycle orchestrator.
//! 6. **Traits:** Collaborator contracts (instruction source, cluster, memory).

/// Rename register budget.
pub mod budget;

/// Per-cycle pipeline orchestrator.
pub mod engine;

/// Decode pipe and instruction queue.
pub mod frontend;

/// Register alias table and dependency resolution.
pub mod rat;

/// Replay and serialization controller.
pub mod replay;

/// Reorder buffer and retire queue.
pub mod rob;

/// Collaborator interfaces.
pub mod traits;

pub use engine::{LockReport, OooProcessor};
