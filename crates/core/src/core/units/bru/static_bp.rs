//! Static branch predictors.
//!
//! Baselines that keep no direction state. Each still owns a BTB so taken
//! predictions and unconditional transfers get a target.

use super::{BranchInfo, PredType, btb::Btb, resolve_direction};

/// Upper bound: the true direction is always known; only the target can miss.
#[derive(Clone, Debug)]
pub struct Oracle {
    btb: Btb,
}

impl Oracle {
    /// Creates the predictor with its BTB geometry.
    pub fn new(btb_size: usize, btb_assoc: usize) -> Self {
        Self {
            btb: Btb::new(btb_size, btb_assoc),
        }
    }

    /// Predicts `br`.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        if !br.taken {
            return PredType::CorrectPrediction;
        }
        self.btb.predict(br, do_update)
    }
}

/// Always predicts conditional branches not taken.
#[derive(Clone, Debug)]
pub struct NotTaken {
    btb: Btb,
}

impl NotTaken {
    /// Creates the predictor with its BTB geometry.
    pub fn new(btb_size: usize, btb_assoc: usize) -> Self {
        Self {
            btb: Btb::new(btb_size, btb_assoc),
        }
    }

    /// Predicts `br`.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        if br.taken {
            PredType::MissPrediction
        } else {
            PredType::CorrectPrediction
        }
    }
}

/// Backward-taken, forward-not-taken.
#[derive(Clone, Debug)]
pub struct NotTakenEnhanced {
    btb: Btb,
}

impl NotTakenEnhanced {
    /// Creates the predictor with its BTB geometry.
    pub fn new(btb_size: usize, btb_assoc: usize) -> Self {
        Self {
            btb: Btb::new(btb_size, btb_assoc),
        }
    }

    /// Predicts `br`.
    ///
    /// A taken branch reveals its target; a not-taken one is assumed forward
    /// unless its BTB entry points backward.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        if br.kind.is_unconditional() {
            return self.btb.predict(br, do_update);
        }
        let target = if br.taken { Some(br.target) } else { self.btb.lookup(br.pc) };
        let ptaken = target.is_some_and(|t| t < br.pc);
        resolve_direction(&mut self.btb, br, ptaken, do_update)
    }
}

/// Always predicts conditional branches taken.
#[derive(Clone, Debug)]
pub struct Taken {
    btb: Btb,
}

impl Taken {
    /// Creates the predictor with its BTB geometry.
    pub fn new(btb_size: usize, btb_assoc: usize) -> Self {
        Self {
            btb: Btb::new(btb_size, btb_assoc),
        }
    }

    /// Predicts `br`.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        resolve_direction(&mut self.btb, br, true, do_update)
    }
}

/// Always mispredicts. Measures the cost of a useless predictor.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysMiss;

impl AlwaysMiss {
    /// Predicts `br`.
    pub const fn predict(&self, _br: &BranchInfo) -> PredType {
        PredType::MissPrediction
    }
}
