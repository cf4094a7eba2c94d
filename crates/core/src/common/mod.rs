//! Common types shared by every part of the timing core.
//!
//! This module provides the small vocabulary the pipeline, predictors and
//! collaborator models all speak. It includes:
//! 1. **Identifiers:** Sequence ids, flow ids, architectural register ids and cycles.
//! 2. **Error Handling:** Fatal invariant violations and configuration errors.

/// Fatal simulation errors and configuration errors.
pub mod error;

/// Identifier newtypes and architectural constants.
pub mod types;

pub use error::{ConfigError, SimError, TraceError};
pub use types::{Cycle, FlowId, NUM_ARCH_REGS, RegId, SeqId};
