//! Branch prediction unit (BRU) implementations.
//!
//! This module contains the predictor family the front-end consults for every
//! control transfer: static baselines, counter-table predictors (2-bit,
//! two-level, hybrid, 2Bc-gskew, yags), O-GEHL, a loop predictor, the branch
//! target buffer (BTB), the return address stack (RAS), and the composite
//! multi-level unit with a meta chooser.

/// Counter-per-PC predictor.
pub mod bimodal;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Multi-level predictor with RAS and meta chooser.
pub mod composite;

/// Hybrid global/local tournament predictor.
pub mod hybrid;

/// Loop trip-count predictor.
pub mod loop_pred;

/// Optimized geometric history length predictor.
pub mod ogehl;

/// Return Address Stack for predicting return addresses.
pub mod ras;

/// Saturating counter tables.
pub mod sc_table;

/// 2Bc-gskew predictor.
pub mod skew;

/// Static baselines.
pub mod static_bp;

/// Two-level local history predictor.
pub mod two_level;

/// Yet Another Global Scheme predictor.
pub mod yags;

use self::{
    bimodal::TwoBit,
    btb::Btb,
    hybrid::Hybrid,
    loop_pred::LoopAugmented,
    ogehl::Ogehl,
    skew::TwoBcgSkew,
    static_bp::{AlwaysMiss, NotTaken, NotTakenEnhanced, Oracle, Taken},
    two_level::TwoLevel,
    yags::Yags,
};
use crate::config::{BranchPredictorConfig, PredictorKind};
use crate::core::dinst::DInst;
use crate::isa::{OpClass, StaticInst};

/// Outcome of a prediction, scored against the real outcome.
///
/// Not having a prediction is a valid result, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredType {
    /// Direction and target were right.
    CorrectPrediction,
    /// The predictor does not handle this instruction.
    NoPrediction,
    /// Direction right, but the target was unknown or stale.
    NoBTBPrediction,
    /// Wrong direction or wrong return address.
    MissPrediction,
}

/// Control-transfer class as the predictors see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// Conditional branch.
    Conditional,
    /// Direct unconditional jump.
    Jump,
    /// Indirect unconditional jump.
    IndirectJump,
    /// Function call.
    Call,
    /// Function return.
    Return,
}

impl BranchKind {
    /// Classifies an operation, or `None` if it is not a control transfer.
    pub const fn of(op: OpClass) -> Option<Self> {
        match op {
            OpClass::Branch => Some(Self::Conditional),
            OpClass::Jump => Some(Self::Jump),
            OpClass::IndirectJump => Some(Self::IndirectJump),
            OpClass::Call => Some(Self::Call),
            OpClass::Return => Some(Self::Return),
            _ => None,
        }
    }

    /// Returns true for every kind except conditional branches.
    #[inline]
    pub const fn is_unconditional(self) -> bool {
        !matches!(self, Self::Conditional)
    }

    /// Returns true for transfers whose target is known at decode.
    #[inline]
    pub const fn is_direct_jump(self) -> bool {
        matches!(self, Self::Jump | Self::Call)
    }
}

/// A resolved control transfer: what the predictors are scored against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchInfo {
    /// Address of the branch.
    pub pc: u64,
    /// Address actually executed next.
    pub target: u64,
    /// Whether control left the sequential path.
    pub taken: bool,
    /// Transfer class.
    pub kind: BranchKind,
    /// Whether this instance counts toward statistics.
    pub stats: bool,
}

impl BranchInfo {
    /// Builds the record for `inst` followed by `next_pc`, or `None` for non-control instructions.
    pub fn new(inst: &StaticInst, next_pc: u64, stats: bool) -> Option<Self> {
        let kind = BranchKind::of(inst.op)?;
        Some(Self {
            pc: inst.pc,
            target: next_pc,
            taken: kind.is_unconditional() || next_pc != inst.fallthrough(),
            kind,
            stats,
        })
    }

    /// Builds the record for a dynamic instruction.
    pub fn from_dinst(dinst: &DInst) -> Option<Self> {
        Self::new(&dinst.inst, dinst.next_pc, dinst.stats)
    }
}

/// Scores a direction guess for a conditional branch.
///
/// A wrong direction is a miss (the BTB still learns the target); a right
/// taken guess still needs the BTB for its target.
pub(crate) fn resolve_direction(btb: &mut Btb, br: &BranchInfo, ptaken: bool, do_update: bool) -> PredType {
    if br.kind.is_unconditional() {
        return btb.predict(br, do_update);
    }
    if ptaken != br.taken {
        if do_update {
            btb.update_only(br);
        }
        return PredType::MissPrediction;
    }
    if ptaken {
        btb.predict(br, do_update)
    } else {
        PredType::CorrectPrediction
    }
}

/// Enum wrapper for static dispatch of branch predictors.
/// This avoids vtable lookups in the critical fetch loop.
#[derive(Clone, Debug)]
pub enum Predictor {
    /// Perfect direction.
    Oracle(Oracle),
    /// Always not taken.
    NotTaken(NotTaken),
    /// Backward taken, forward not taken.
    NotTakenEnhanced(NotTakenEnhanced),
    /// Always taken.
    Taken(Taken),
    /// Always wrong.
    Miss(AlwaysMiss),
    /// Saturating counter per PC.
    TwoBit(TwoBit),
    /// Local history two-level.
    TwoLevel(TwoLevel),
    /// Global/local tournament.
    Hybrid(Hybrid),
    /// 2Bc-gskew.
    TwoBcgSkew(TwoBcgSkew),
    /// Yags.
    Yags(Yags),
    /// O-GEHL.
    Ogehl(Ogehl),
    /// Bimodal plus loop table.
    Loop(LoopAugmented),
    /// Target cache only; a branch with a recorded target is predicted taken.
    Btb(Btb),
}

impl Predictor {
    /// Builds the predictor of `kind` sized by `config`.
    pub fn new(kind: PredictorKind, config: &BranchPredictorConfig) -> Self {
        let btb = || Btb::new(config.btb_size, config.btb_assoc);
        match kind {
            PredictorKind::Oracle => Self::Oracle(Oracle::new(config.btb_size, config.btb_assoc)),
            PredictorKind::NotTaken => Self::NotTaken(NotTaken::new(config.btb_size, config.btb_assoc)),
            PredictorKind::NotTakenEnhanced => {
                Self::NotTakenEnhanced(NotTakenEnhanced::new(config.btb_size, config.btb_assoc))
            }
            PredictorKind::Taken => Self::Taken(Taken::new(config.btb_size, config.btb_assoc)),
            PredictorKind::Miss => Self::Miss(AlwaysMiss),
            PredictorKind::TwoBit => Self::TwoBit(TwoBit::new(&config.two_bit, btb())),
            PredictorKind::TwoLevel => Self::TwoLevel(TwoLevel::new(&config.two_level, btb())),
            PredictorKind::Hybrid => Self::Hybrid(Hybrid::new(&config.hybrid, btb())),
            PredictorKind::TwoBcgSkew => Self::TwoBcgSkew(TwoBcgSkew::new(&config.skew, btb())),
            PredictorKind::Yags => Self::Yags(Yags::new(&config.yags, btb())),
            PredictorKind::Ogehl => Self::Ogehl(Ogehl::new(&config.ogehl, btb())),
            PredictorKind::Loop => Self::Loop(LoopAugmented::new(&config.two_bit, &config.loop_pred, btb())),
            PredictorKind::Btb => Self::Btb(btb()),
        }
    }

    /// Predicts `br` and, if `do_update`, trains on its real outcome.
    ///
    /// `key` is the history hash of the branch PC.
    #[inline(always)]
    pub fn predict(&mut self, br: &BranchInfo, key: u64, do_update: bool) -> PredType {
        match self {
            Self::Oracle(p) => p.predict(br, do_update),
            Self::NotTaken(p) => p.predict(br, do_update),
            Self::NotTakenEnhanced(p) => p.predict(br, do_update),
            Self::Taken(p) => p.predict(br, do_update),
            Self::Miss(p) => p.predict(br),
            Self::TwoBit(p) => p.predict(br, key, do_update),
            Self::TwoLevel(p) => p.predict(br, key, do_update),
            Self::Hybrid(p) => p.predict(br, key, do_update),
            Self::TwoBcgSkew(p) => p.predict(br, key, do_update),
            Self::Yags(p) => p.predict(br, key, do_update),
            Self::Ogehl(p) => p.predict(br, key, do_update),
            Self::Loop(p) => p.predict(br, key, do_update),
            Self::Btb(p) => {
                let ptaken = p.lookup(br.pc).is_some();
                resolve_direction(p, br, ptaken, do_update)
            }
        }
    }
}

/// One predictor level: a predictor plus its hit/miss accounting.
///
/// Predictors never touch the counters themselves; [`do_predict`](Self::do_predict)
/// scores each real branch exactly once and [`update`](Self::update) trains without scoring.
#[derive(Clone, Debug)]
pub struct BPred {
    kind: PredictorKind,
    predictor: Predictor,
    addr_shift: u32,
    hits: u64,
    misses: u64,
}

impl BPred {
    /// Builds a level of `kind`.
    pub fn new(kind: PredictorKind, config: &BranchPredictorConfig) -> Self {
        Self {
            kind,
            predictor: Predictor::new(kind, config),
            addr_shift: config.addr_shift,
            hits: 0,
            misses: 0,
        }
    }

    /// Hash of a branch PC used to index history tables.
    ///
    /// Drops the alignment bits and the `addr_shift` bits that select a
    /// slot within one fetch group, then folds high bits down.
    #[inline]
    pub const fn calc_hist(&self, pc: u64) -> u64 {
        let cid = (pc >> 2) >> self.addr_shift;
        cid ^ (cid >> 17)
    }

    /// Predicts and trains, without scoring.
    pub fn predict(&mut self, br: &BranchInfo, do_update: bool) -> PredType {
        let key = self.calc_hist(br.pc);
        self.predictor.predict(br, key, do_update)
    }

    /// Predicts, trains and scores `br`.
    ///
    /// Unconditional transfers and `NoPrediction` results are not scored.
    pub fn do_predict(&mut self, br: &BranchInfo, do_stats: bool) -> PredType {
        let pred = self.predict(br, true);
        if pred == PredType::NoPrediction || br.kind.is_unconditional() {
            return pred;
        }
        if br.stats && do_stats {
            match pred {
                PredType::CorrectPrediction => self.hits += 1,
                PredType::MissPrediction => self.misses += 1,
                PredType::NoPrediction | PredType::NoBTBPrediction => {}
            }
        }
        pred
    }

    /// Trains on `br` without scoring.
    pub fn update(&mut self, br: &BranchInfo) {
        let _ = self.predict(br, true);
    }

    /// Algorithm of this level.
    pub const fn kind(&self) -> PredictorKind {
        self.kind
    }

    /// Scored correct predictions.
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Scored mispredictions.
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}
