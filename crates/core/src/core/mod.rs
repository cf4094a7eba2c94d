//! Core processor timing model.
//!
//! This module contains the dynamic instruction arena, the out-of-order
//! pipeline and the prediction units the pipeline consults.

/// Dynamic instruction records and their arena.
pub mod dinst;

/// Out-of-order pipeline (rename, ROB, replay, engine).
pub mod pipeline;

/// Prediction units (branch predictors, load-branch correlation).
pub mod units;

pub use self::pipeline::OooProcessor;
