//! Replay and serialization controller.
//!
//! This module keeps a relaxed out-of-order model honest about memory ordering. It provides:
//! 1. **Replay:** A stale load raises the replay point; the pipeline then drains and
//!    flushes everything from the first marked instruction onward.
//! 2. **Forward Progress:** Replays that recur within the threshold make the
//!    serialization level stronger; every quiet interval relaxes it by one step.
//! 3. **Serialization:** While a serialization window is open, memory instructions are
//!    chained behind earlier ones through an extra source link.

use tracing::debug;

use crate::common::{NUM_ARCH_REGS, RegId, SeqId, SimError};
use crate::config::PipelineConfig;
use crate::core::dinst::{DInstPool, InstHandle};
use crate::core::pipeline::rat::{SERIAL_SLOT, add_dependency};

/// How conservatively memory instructions are ordered.
///
/// Variants are ordered by strength, so `Off < SameRegister < StoreOrdered < All`.
/// [`code`](Self::code) gives the conventional numbering, where 0 is the strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SerializeLevel {
    /// No artificial ordering (level 3).
    Off,
    /// Memory operations through the same base register are chained (level 2).
    SameRegister,
    /// Stores are ordered after memory operations and loads after stores (level 1).
    StoreOrdered,
    /// Every memory operation is chained to the previous one (level 0).
    All,
}

impl SerializeLevel {
    /// Conventional level number: 0 = all, 1 = stores, 2 = same register, 3 = off.
    pub const fn code(self) -> u8 {
        match self {
            Self::All => 0,
            Self::StoreOrdered => 1,
            Self::SameRegister => 2,
            Self::Off => 3,
        }
    }

    /// Inverse of [`code`](Self::code). Values above 3 mean off.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::All,
            1 => Self::StoreOrdered,
            2 => Self::SameRegister,
            _ => Self::Off,
        }
    }

    /// One step stronger, saturating at [`SerializeLevel::All`].
    pub const fn stronger(self) -> Self {
        match self {
            Self::Off => Self::SameRegister,
            Self::SameRegister => Self::StoreOrdered,
            Self::StoreOrdered | Self::All => Self::All,
        }
    }

    /// One step weaker, saturating at [`SerializeLevel::Off`].
    pub const fn weaker(self) -> Self {
        match self {
            Self::All => Self::StoreOrdered,
            Self::StoreOrdered => Self::SameRegister,
            Self::SameRegister | Self::Off => Self::Off,
        }
    }
}

/// What a replay request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayDecision {
    /// A new recovery started.
    Started,
    /// Already recovering; only the replay point moved (if it rose).
    Merged,
    /// Ignored: a serialization window is open.
    Suppressed,
    /// Ignored: memory replay is disabled.
    Disabled,
}

/// Serialization level change caused by a recovery or a quiet interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelChange {
    /// The level did not move.
    Unchanged,
    /// The level became stronger.
    Escalated(SerializeLevel),
    /// The level became weaker.
    Relaxed(SerializeLevel),
}

/// Result of a completed recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recovery {
    /// First sequence id to fetch again.
    pub resume: SeqId,
    /// Serialization level change.
    pub change: LevelChange,
}

/// Replay and serialization state of one core.
#[derive(Debug)]
pub struct ReplayController {
    enabled: bool,
    level: SerializeLevel,
    window: u64,
    serialize_for: u64,
    threshold: u64,
    replay_id: SeqId,
    last_replay: SeqId,
    relax_mark: SeqId,
    recovering: bool,
    flushing: bool,
    flush_start: Option<SeqId>,
    last_serialized: Option<InstHandle>,
    last_serialized_st: Option<InstHandle>,
    serialize_rat: [Option<InstHandle>; NUM_ARCH_REGS],
    last_serialize_reg: Option<RegId>,
    last_serialize_pc: u64,
}

impl ReplayController {
    /// Creates a controller from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        let threshold = config.forward_progress_threshold;
        Self {
            enabled: config.memory_replay,
            level: SerializeLevel::from_code(config.serialize_level),
            window: config.serialize_window,
            serialize_for: 0,
            threshold,
            replay_id: SeqId(0),
            last_replay: SeqId(0),
            relax_mark: SeqId(2 * threshold),
            recovering: false,
            flushing: false,
            flush_start: None,
            last_serialized: None,
            last_serialized_st: None,
            serialize_rat: [None; NUM_ARCH_REGS],
            last_serialize_reg: None,
            last_serialize_pc: 0,
        }
    }

    /// Current serialization level.
    pub const fn level(&self) -> SerializeLevel {
        self.level
    }

    /// Instructions left in the open serialization window.
    pub const fn serialize_for(&self) -> u64 {
        self.serialize_for
    }

    /// Highest sequence id a replay was requested for.
    pub const fn replay_id(&self) -> SeqId {
        self.replay_id
    }

    /// Returns true between a replay request and the end of its recovery.
    pub const fn is_recovering(&self) -> bool {
        self.recovering
    }

    /// Returns true once the first marked instruction reached commit.
    pub const fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Whether rename must hold instruction `id` back.
    pub fn must_stall(&self, id: SeqId) -> bool {
        self.recovering && id > self.replay_id
    }

    /// Requests a replay at the stale load `id`.
    ///
    /// The caller marks the instruction when the decision is `Started` or `Merged`.
    pub fn request(&mut self, id: SeqId) -> ReplayDecision {
        if self.serialize_for > 0 {
            return ReplayDecision::Suppressed;
        }
        if !self.enabled {
            return ReplayDecision::Disabled;
        }
        if self.replay_id < id {
            self.replay_id = id;
        }
        if self.recovering {
            return ReplayDecision::Merged;
        }
        self.recovering = true;
        debug!(replay_id = self.replay_id.0, "replay requested");
        ReplayDecision::Started
    }

    /// A marked instruction reached the commit step: everything from `id` on is discarded.
    pub fn start_flushing(&mut self, id: SeqId) {
        if !self.flushing {
            self.flushing = true;
            self.flush_start = Some(id);
        }
    }

    /// Ends a recovery once the ROB and retire queue are empty.
    ///
    /// Replays that arrive closer than the forward-progress threshold escalate
    /// serialization and open a serialization window.
    pub fn finish_recovery(&mut self) -> Recovery {
        let resume = self.flush_start.unwrap_or(self.replay_id);
        let distance = self.replay_id.0.saturating_sub(self.last_replay.0);

        let change = if distance < self.threshold {
            let before = self.level;
            self.level = self.level.stronger();
            self.serialize_for = self.window;
            if self.level == before {
                LevelChange::Unchanged
            } else {
                LevelChange::Escalated(self.level)
            }
        } else {
            LevelChange::Unchanged
        };

        debug!(
            resume = resume.0,
            distance,
            level = self.level.code(),
            "replay recovery complete"
        );

        self.last_replay = self.replay_id;
        self.relax_mark = SeqId(self.replay_id.0 + 2 * self.threshold);
        self.recovering = false;
        self.flushing = false;
        self.flush_start = None;
        self.last_serialized = None;
        self.last_serialized_st = None;
        self.serialize_rat = [None; NUM_ARCH_REGS];
        self.last_serialize_reg = None;

        Recovery { resume, change }
    }

    /// Called for every committed instruction; relaxes the level once per
    /// quiet interval of twice the threshold.
    pub fn on_commit(&mut self, id: SeqId) -> LevelChange {
        if id < self.relax_mark {
            return LevelChange::Unchanged;
        }
        self.relax_mark = SeqId(id.0 + 2 * self.threshold);
        let before = self.level;
        self.level = self.level.weaker();
        if self.level == before {
            LevelChange::Unchanged
        } else {
            debug!(level = self.level.code(), "serialization relaxed");
            LevelChange::Relaxed(self.level)
        }
    }

    /// Forgets a retiring instruction as a serialization anchor.
    pub fn on_retire(&mut self, h: InstHandle) {
        if self.last_serialized == Some(h) {
            self.last_serialized = None;
        }
        if self.last_serialized_st == Some(h) {
            self.last_serialized_st = None;
        }
    }

    /// Applies the current serialization level to a freshly renamed instruction.
    ///
    /// Returns the instruction it was chained behind, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StaleHandle`] if `h` is not live.
    pub fn serialize(&mut self, pool: &mut DInstPool, h: InstHandle) -> Result<Option<InstHandle>, SimError> {
        if self.serialize_for == 0 || self.recovering {
            return Ok(None);
        }
        self.serialize_for -= 1;

        let (inst, pc) = pool.get(h).map(|d| (d.inst.clone(), d.pc())).ok_or(SimError::StaleHandle {
            index: h.index(),
            structure: "serialize",
        })?;

        let mut chained = None;
        let mut chain = |pool: &mut DInstPool, prev: Option<InstHandle>, check_issued: bool| -> Result<(), SimError> {
            if let Some(p) = prev {
                let open = pool.get(p).is_some_and(|d| !check_issued || !d.is_issued());
                if open && add_dependency(pool, SERIAL_SLOT, p, h)? {
                    chained = Some(p);
                }
            }
            Ok(())
        };

        match self.level {
            SerializeLevel::Off => {}
            SerializeLevel::All => {
                if inst.is_memory() {
                    chain(pool, self.last_serialized, true)?;
                    self.last_serialized = Some(h);
                }
            }
            SerializeLevel::StoreOrdered => {
                if inst.is_load() {
                    chain(pool, self.last_serialized_st, true)?;
                    self.last_serialized = Some(h);
                }
                if inst.is_store() {
                    chain(pool, self.last_serialized, true)?;
                    self.last_serialized_st = Some(h);
                }
            }
            SerializeLevel::SameRegister => {
                if !inst.regs.src1.is_zero() {
                    self.last_serialize_reg = Some(inst.regs.src1);
                } else if self.last_serialize_pc != pc {
                    self.last_serialize_reg = None;
                }
                self.last_serialize_pc = pc;

                if let Some(reg) = self.last_serialize_reg {
                    if inst.is_memory() {
                        let prev = self.serialize_rat[reg.index()];
                        let prev_is_store = prev.and_then(|p| pool.get(p)).is_some_and(|d| d.inst.is_store());
                        // Loads only wait for stores; stores wait for anything.
                        if inst.is_store() || prev_is_store {
                            chain(pool, prev, false)?;
                        }
                        self.serialize_rat[reg.index()] = Some(h);
                    } else if inst.has_dst_register() {
                        self.serialize_rat[inst.regs.dst.index()] = None;
                    }
                }
            }
        }
        Ok(chained)
    }
}
