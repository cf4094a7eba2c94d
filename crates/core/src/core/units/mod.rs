//! Prediction units consulted by the pipeline.
//!
//! This module contains the branch prediction unit (every direction
//! predictor, the BTB, the RAS and the composite unit) and the optional
//! load-branch correlation prefetcher.

/// Branch Resolution Unit including branch predictors and BTB.
pub mod bru;

/// Load-branch correlation prefetch trigger.
pub mod ldbp;
