//! Decoded instruction templates.
//!
//! The timing core never decodes raw encodings: the functional instruction
//! source hands it already-decoded templates. This module defines the shape
//! of those templates and of the per-instance data that accompanies them.

/// Static instruction templates and per-instance fetch records.
pub mod instruction;

pub use instruction::{FetchedInst, OpClass, RegOperands, StaticInst};
