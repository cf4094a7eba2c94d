//! Configuration system for the timing core.
//!
//! This module defines every structure used to parameterize a simulated core. It provides:
//! 1. **Defaults:** Baseline widths, queue sizes, predictor table sizes and replay thresholds.
//! 2. **Structures:** Pipeline, branch predictor and reference collaborator configuration.
//! 3. **Enums:** Predictor algorithm selection.
//! 4. **Validation:** A single `validate` pass run before any engine is built.
//!
//! Configuration is read once, from JSON or from `SimConfig::default()`. The engine copies the
//! values it needs at construction and never consults configuration from the per-tick path.

use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;

/// Default configuration constants for the timing core.
///
/// These values define the baseline core when a field is not explicitly
/// overridden in the JSON configuration.
mod defaults {
    /// Instructions fetched per cycle.
    pub const FETCH_WIDTH: usize = 4;

    /// Instructions renamed per cycle.
    pub const ISSUE_WIDTH: usize = 4;

    /// Capacity of the instruction queue between decode and rename.
    pub const INST_QUEUE_SIZE: usize = 16;

    /// Cycles a fetched bundle spends in the decode pipe.
    pub const DECODE_DELAY: u64 = 3;

    /// Combined capacity of the ROB and the retire queue.
    pub const MAX_ROB_SIZE: usize = 128;

    /// Instructions committed per cycle.
    pub const RETIRE_WIDTH: usize = 4;

    /// Minimum cycles between execution completion and commit.
    pub const RETIRE_DELAY: u64 = 2;

    /// Rename register budget. Zero means unlimited.
    pub const TOTAL_REGS: usize = 0;

    /// Serialization level the core starts at (same-register chaining).
    pub const SERIALIZE_LEVEL: u8 = 2;

    /// Instructions covered by a serialization window after an escalation.
    pub const SERIALIZE_WINDOW: u64 = 64;

    /// Sequence distance under which two replays count as "too close".
    pub const FORWARD_PROGRESS_THRESHOLD: u64 = 200;

    /// Cycles between two liveness (lock) checks.
    pub const LOCK_CHECK_INTERVAL: u64 = 100_000;

    /// Return Address Stack depth.
    pub const RAS_SIZE: usize = 32;

    /// Branch Target Buffer entries.
    pub const BTB_SIZE: usize = 2048;

    /// Branch Target Buffer associativity.
    pub const BTB_ASSOC: usize = 4;

    /// Fetch bubble when a taken branch misses in the BTB.
    pub const BTB_MISS_DELAY: u64 = 2;

    /// Prediction latency of the first-level predictor.
    pub const BPRED_DELAY1: u64 = 0;

    /// Prediction latency of the second-level predictor.
    pub const BPRED_DELAY2: u64 = 2;

    /// Prediction latency of the third-level predictor.
    pub const BPRED_DELAY3: u64 = 4;

    /// Default saturating counter table size.
    pub const COUNTER_TABLE_SIZE: usize = 16 * 1024;

    /// Default saturating counter width.
    pub const COUNTER_BITS: u8 = 2;

    /// Default first-level history table size of the two-level predictor.
    pub const L1_SIZE: usize = 1024;

    /// Default branch history length.
    pub const HISTORY_SIZE: u32 = 10;

    /// Meta chooser table size.
    pub const META_SIZE: usize = 4096;

    /// Default size of the yags exception caches.
    pub const YAGS_CACHE_SIZE: usize = 2048;

    /// Default tag width of the yags exception caches.
    pub const YAGS_TAG_BITS: u32 = 6;

    /// Default number of OGEHL tables.
    pub const OGEHL_TABLES: usize = 6;

    /// Default longest OGEHL history.
    pub const OGEHL_MAX_HISTORY: usize = 200;

    /// Default log2 of the OGEHL table size.
    pub const OGEHL_LOG_SIZE: u32 = 11;

    /// Default OGEHL counter width.
    pub const OGEHL_COUNTER_BITS: u8 = 4;

    /// Default loop predictor entries.
    pub const LOOP_SIZE: usize = 256;

    /// Trip-count repetitions needed before the loop predictor overrides.
    pub const LOOP_CONFIDENCE: u8 = 8;

    /// Reference cluster: instruction window entries.
    pub const WINDOW_SIZE: usize = 32;

    /// Reference cluster: load/store queue entries.
    pub const LSQ_SIZE: usize = 32;

    /// Reference memory: cycles before a retired store becomes visible.
    pub const STORE_LATENCY: u64 = 4;

    /// Reference memory: extra cycles a load spends in the data cache.
    pub const LOAD_LATENCY: u64 = 2;
}

/// Branch prediction algorithm.
///
/// Selects the algorithm used at one level of the composite predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PredictorKind {
    /// Perfect direction; target from the BTB.
    Oracle,
    /// Always predict not-taken.
    NotTaken,
    /// Backward-taken, forward-not-taken.
    NotTakenEnhanced,
    /// Always predict taken.
    Taken,
    /// Always report a misprediction (lower bound).
    Miss,
    /// Table of n-bit saturating counters indexed by PC.
    #[serde(alias = "2bit")]
    TwoBit,
    /// Per-branch local history indexing a counter table.
    #[serde(alias = "2level")]
    TwoLevel,
    /// Local/global tables with a meta chooser.
    #[default]
    Hybrid,
    /// 2Bc-gskew: bimodal plus two skewed global tables with majority vote.
    #[serde(alias = "2BcgSkew")]
    TwoBcgSkew,
    /// Yet Another Global Scheme: bias table plus tagged exception caches.
    Yags,
    /// Optimized geometric history length predictor.
    #[serde(alias = "OGEHL")]
    Ogehl,
    /// Loop trip-count predictor over a bimodal base.
    Loop,
    /// Direction from BTB presence alone.
    #[serde(alias = "BTB")]
    Btb,
}

/// Root configuration object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfig {
    /// Pipeline widths, queue sizes and replay control.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Branch predictor ensemble.
    #[serde(default)]
    pub bpred: BranchPredictorConfig,
    /// Reference execution cluster.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Reference memory system.
    #[serde(default)]
    pub memory: MemoryModelConfig,
}

impl SimConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Example
    ///
    /// ```
    /// use ooosim_core::config::SimConfig;
    ///
    /// let json = r#"{ "pipeline": { "max_rob_size": 64 }, "bpred": { "pred1": "TwoBit" } }"#;
    /// let config = SimConfig::from_json(json)?;
    /// assert_eq!(config.pipeline.max_rob_size, 64);
    /// # Ok::<(), ooosim_core::common::ConfigError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any error reported by
    /// [`SimConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the same
    /// errors as [`SimConfig::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks every structural constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.bpred.validate()?;
        self.cluster.validate()
    }
}

fn non_zero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero(field))
    } else {
        Ok(())
    }
}

fn power_of_two(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { field, value })
    }
}

fn history_bits(field: &'static str, bits: u32) -> Result<(), ConfigError> {
    if (1..=32).contains(&bits) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            reason: format!("history length {bits} not in 1..=32"),
        })
    }
}

fn counter_bits(field: &'static str, bits: u8) -> Result<(), ConfigError> {
    if (1..=7).contains(&bits) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            reason: format!("counter width {bits} not in 1..=7"),
        })
    }
}

/// Pipeline widths, structure sizes and replay control.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Instructions fetched per cycle
    #[serde(default = "PipelineConfig::default_fetch_width")]
    pub fetch_width: usize,

    /// Instructions renamed per cycle
    #[serde(default = "PipelineConfig::default_issue_width")]
    pub issue_width: usize,

    /// Instruction queue capacity
    #[serde(default = "PipelineConfig::default_inst_queue_size")]
    pub inst_queue_size: usize,

    /// Decode pipe depth in cycles
    #[serde(default = "PipelineConfig::default_decode_delay")]
    pub decode_delay: u64,

    /// Combined ROB and retire queue capacity
    #[serde(default = "PipelineConfig::default_max_rob_size")]
    pub max_rob_size: usize,

    /// Instructions committed per cycle
    #[serde(default = "PipelineConfig::default_retire_width")]
    pub retire_width: usize,

    /// Cycles between execution completion and commit
    #[serde(default = "PipelineConfig::default_retire_delay")]
    pub retire_delay: u64,

    /// Rename register budget (0 = unlimited)
    #[serde(default)]
    pub total_regs: usize,

    /// Whether stale loads trigger a replay
    #[serde(default = "PipelineConfig::default_memory_replay")]
    pub memory_replay: bool,

    /// Initial serialization level (0 = all memory ops ... 3 = off)
    #[serde(default = "PipelineConfig::default_serialize_level")]
    pub serialize_level: u8,

    /// Instructions covered by a serialization window
    #[serde(default = "PipelineConfig::default_serialize_window")]
    pub serialize_window: u64,

    /// Replay distance that escalates serialization
    #[serde(default = "PipelineConfig::default_forward_progress_threshold")]
    pub forward_progress_threshold: u64,

    /// Cycles between lock checks
    #[serde(default = "PipelineConfig::default_lock_check_interval")]
    pub lock_check_interval: u64,

    /// Enable the load-branch correlation prefetch extension
    #[serde(default)]
    pub enable_ldbp: bool,
}

impl PipelineConfig {
    /// Returns the default fetch width.
    fn default_fetch_width() -> usize {
        defaults::FETCH_WIDTH
    }

    /// Returns the default rename width.
    fn default_issue_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    /// Returns the default instruction queue capacity.
    fn default_inst_queue_size() -> usize {
        defaults::INST_QUEUE_SIZE
    }

    /// Returns the default decode pipe depth.
    fn default_decode_delay() -> u64 {
        defaults::DECODE_DELAY
    }

    /// Returns the default ROB capacity.
    fn default_max_rob_size() -> usize {
        defaults::MAX_ROB_SIZE
    }

    /// Returns the default retire width.
    fn default_retire_width() -> usize {
        defaults::RETIRE_WIDTH
    }

    /// Returns the default retire delay.
    fn default_retire_delay() -> u64 {
        defaults::RETIRE_DELAY
    }

    /// Memory replay is on unless disabled.
    fn default_memory_replay() -> bool {
        true
    }

    /// Returns the default serialization level.
    fn default_serialize_level() -> u8 {
        defaults::SERIALIZE_LEVEL
    }

    /// Returns the default serialization window.
    fn default_serialize_window() -> u64 {
        defaults::SERIALIZE_WINDOW
    }

    /// Returns the default forward-progress threshold.
    fn default_forward_progress_threshold() -> u64 {
        defaults::FORWARD_PROGRESS_THRESHOLD
    }

    /// Returns the default lock check interval.
    fn default_lock_check_interval() -> u64 {
        defaults::LOCK_CHECK_INTERVAL
    }

    fn validate(&self) -> Result<(), ConfigError> {
        non_zero("pipeline.fetch_width", self.fetch_width)?;
        non_zero("pipeline.issue_width", self.issue_width)?;
        non_zero("pipeline.retire_width", self.retire_width)?;
        non_zero("pipeline.max_rob_size", self.max_rob_size)?;
        if self.inst_queue_size < self.fetch_width {
            return Err(ConfigError::OutOfRange {
                field: "pipeline.inst_queue_size",
                reason: format!(
                    "{} cannot hold one fetch bundle of {}",
                    self.inst_queue_size, self.fetch_width
                ),
            });
        }
        if self.serialize_level > 3 {
            return Err(ConfigError::OutOfRange {
                field: "pipeline.serialize_level",
                reason: format!("{} not in 0..=3", self.serialize_level),
            });
        }
        if self.forward_progress_threshold == 0 {
            return Err(ConfigError::Zero("pipeline.forward_progress_threshold"));
        }
        if self.lock_check_interval == 0 {
            return Err(ConfigError::Zero("pipeline.lock_check_interval"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// Creates a 4-wide core with a 128-entry ROB, unlimited registers
    /// and memory replay enabled.
    fn default() -> Self {
        Self {
            fetch_width: defaults::FETCH_WIDTH,
            issue_width: defaults::ISSUE_WIDTH,
            inst_queue_size: defaults::INST_QUEUE_SIZE,
            decode_delay: defaults::DECODE_DELAY,
            max_rob_size: defaults::MAX_ROB_SIZE,
            retire_width: defaults::RETIRE_WIDTH,
            retire_delay: defaults::RETIRE_DELAY,
            total_regs: defaults::TOTAL_REGS,
            memory_replay: true,
            serialize_level: defaults::SERIALIZE_LEVEL,
            serialize_window: defaults::SERIALIZE_WINDOW,
            forward_progress_threshold: defaults::FORWARD_PROGRESS_THRESHOLD,
            lock_check_interval: defaults::LOCK_CHECK_INTERVAL,
            enable_ldbp: false,
        }
    }
}

/// Branch predictor ensemble configuration.
///
/// Up to three predictor levels run for every conditional branch. Level 1 is
/// mandatory; a later level that disagrees with an earlier one overrides it at
/// the cost of its own delay. A meta chooser arbitrates between levels 2 and 3.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchPredictorConfig {
    /// Return Address Stack depth
    #[serde(default = "BranchPredictorConfig::default_ras_size")]
    pub ras_size: usize,

    /// Return addresses offered to the instruction prefetcher (0 = off)
    #[serde(default)]
    pub ras_prefetch: usize,

    /// First-level algorithm
    #[serde(default)]
    pub pred1: PredictorKind,

    /// Optional second-level algorithm
    #[serde(default)]
    pub pred2: Option<PredictorKind>,

    /// Optional third-level algorithm
    #[serde(default)]
    pub pred3: Option<PredictorKind>,

    /// First-level prediction latency
    #[serde(default = "BranchPredictorConfig::default_delay1")]
    pub bpred_delay1: u64,

    /// Second-level prediction latency
    #[serde(default = "BranchPredictorConfig::default_delay2")]
    pub bpred_delay2: u64,

    /// Third-level prediction latency
    #[serde(default = "BranchPredictorConfig::default_delay3")]
    pub bpred_delay3: u64,

    /// Meta chooser entries
    #[serde(default = "BranchPredictorConfig::default_meta_size")]
    pub meta_size: usize,

    /// BTB entries
    #[serde(default = "BranchPredictorConfig::default_btb_size")]
    pub btb_size: usize,

    /// BTB ways
    #[serde(default = "BranchPredictorConfig::default_btb_assoc")]
    pub btb_assoc: usize,

    /// Fetch bubble on a BTB miss for a taken branch
    #[serde(default = "BranchPredictorConfig::default_btb_miss_delay")]
    pub btb_miss_delay: u64,

    /// Low PC bits dropped before hashing
    #[serde(default)]
    pub addr_shift: u32,

    /// 2-bit and bimodal tables
    #[serde(default)]
    pub two_bit: CounterTableConfig,

    /// Two-level adaptive predictor
    #[serde(default)]
    pub two_level: TwoLevelConfig,

    /// Hybrid predictor
    #[serde(default)]
    pub hybrid: HybridConfig,

    /// 2Bc-gskew predictor
    #[serde(default)]
    pub skew: SkewConfig,

    /// Yags predictor
    #[serde(default)]
    pub yags: YagsConfig,

    /// OGEHL predictor
    #[serde(default)]
    pub ogehl: OgehlConfig,

    /// Loop predictor
    #[serde(default)]
    pub loop_pred: LoopConfig,
}

impl BranchPredictorConfig {
    /// Returns the default RAS depth.
    fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }

    /// Returns the default level-1 latency.
    fn default_delay1() -> u64 {
        defaults::BPRED_DELAY1
    }

    /// Returns the default level-2 latency.
    fn default_delay2() -> u64 {
        defaults::BPRED_DELAY2
    }

    /// Returns the default level-3 latency.
    fn default_delay3() -> u64 {
        defaults::BPRED_DELAY3
    }

    /// Returns the default meta chooser size.
    fn default_meta_size() -> usize {
        defaults::META_SIZE
    }

    /// Returns the default BTB size.
    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }

    /// Returns the default BTB associativity.
    fn default_btb_assoc() -> usize {
        defaults::BTB_ASSOC
    }

    /// Returns the default BTB miss bubble.
    fn default_btb_miss_delay() -> u64 {
        defaults::BTB_MISS_DELAY
    }

    fn validate(&self) -> Result<(), ConfigError> {
        non_zero("bpred.ras_size", self.ras_size)?;
        non_zero("bpred.btb_assoc", self.btb_assoc)?;
        power_of_two("bpred.btb_size", self.btb_size)?;
        power_of_two("bpred.meta_size", self.meta_size)?;
        if self.btb_size < self.btb_assoc || !(self.btb_size / self.btb_assoc).is_power_of_two() {
            return Err(ConfigError::OutOfRange {
                field: "bpred.btb_assoc",
                reason: format!("{} ways do not divide {} entries into 2^n sets", self.btb_assoc, self.btb_size),
            });
        }
        if self.pred2.is_none() && self.pred3.is_some() {
            return Err(ConfigError::OutOfRange {
                field: "bpred.pred3",
                reason: "a third level requires a second level".to_string(),
            });
        }
        if self.ras_prefetch > self.ras_size {
            return Err(ConfigError::OutOfRange {
                field: "bpred.ras_prefetch",
                reason: format!("{} exceeds the RAS depth {}", self.ras_prefetch, self.ras_size),
            });
        }
        power_of_two("bpred.two_bit.size", self.two_bit.size)?;
        counter_bits("bpred.two_bit.bits", self.two_bit.bits)?;
        power_of_two("bpred.two_level.l1_size", self.two_level.l1_size)?;
        power_of_two("bpred.two_level.l2_size", self.two_level.l2_size)?;
        counter_bits("bpred.two_level.bits", self.two_level.bits)?;
        power_of_two("bpred.hybrid.local_size", self.hybrid.local_size)?;
        power_of_two("bpred.hybrid.global_size", self.hybrid.global_size)?;
        power_of_two("bpred.hybrid.meta_size", self.hybrid.meta_size)?;
        counter_bits("bpred.hybrid.bits", self.hybrid.bits)?;
        power_of_two("bpred.skew.bim_size", self.skew.bim_size)?;
        power_of_two("bpred.skew.g0_size", self.skew.g0_size)?;
        power_of_two("bpred.skew.g1_size", self.skew.g1_size)?;
        power_of_two("bpred.skew.meta_size", self.skew.meta_size)?;
        power_of_two("bpred.yags.size", self.yags.size)?;
        power_of_two("bpred.yags.cache_size", self.yags.cache_size)?;
        power_of_two("bpred.loop_pred.size", self.loop_pred.size)?;
        history_bits("bpred.two_level.history_size", self.two_level.history_size)?;
        history_bits("bpred.hybrid.history_size", self.hybrid.history_size)?;
        history_bits("bpred.skew.g0_history", self.skew.g0_history)?;
        history_bits("bpred.skew.g1_history", self.skew.g1_history)?;
        history_bits("bpred.skew.meta_history", self.skew.meta_history)?;
        history_bits("bpred.yags.history_size", self.yags.history_size)?;
        history_bits("bpred.yags.tag_bits", self.yags.tag_bits)?;
        if !(4..=24).contains(&self.ogehl.log_size) {
            return Err(ConfigError::OutOfRange {
                field: "bpred.ogehl.log_size",
                reason: format!("{} not in 4..=24", self.ogehl.log_size),
            });
        }
        if self.ogehl.max_history < self.ogehl.tables || self.ogehl.max_history > 1024 {
            return Err(ConfigError::OutOfRange {
                field: "bpred.ogehl.max_history",
                reason: format!("{} not in {}..=1024", self.ogehl.max_history, self.ogehl.tables),
            });
        }
        if self.ogehl.tables < 3 {
            return Err(ConfigError::OutOfRange {
                field: "bpred.ogehl.tables",
                reason: format!("{} tables, at least 3 required", self.ogehl.tables),
            });
        }
        counter_bits("bpred.ogehl.counter_bits", self.ogehl.counter_bits)?;
        Ok(())
    }
}

impl Default for BranchPredictorConfig {
    /// Creates a single-level hybrid predictor with a 2K-entry, 4-way BTB.
    fn default() -> Self {
        Self {
            ras_size: defaults::RAS_SIZE,
            ras_prefetch: 0,
            pred1: PredictorKind::default(),
            pred2: None,
            pred3: None,
            bpred_delay1: defaults::BPRED_DELAY1,
            bpred_delay2: defaults::BPRED_DELAY2,
            bpred_delay3: defaults::BPRED_DELAY3,
            meta_size: defaults::META_SIZE,
            btb_size: defaults::BTB_SIZE,
            btb_assoc: defaults::BTB_ASSOC,
            btb_miss_delay: defaults::BTB_MISS_DELAY,
            addr_shift: 0,
            two_bit: CounterTableConfig::default(),
            two_level: TwoLevelConfig::default(),
            hybrid: HybridConfig::default(),
            skew: SkewConfig::default(),
            yags: YagsConfig::default(),
            ogehl: OgehlConfig::default(),
            loop_pred: LoopConfig::default(),
        }
    }
}

/// Saturating counter table sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CounterTableConfig {
    /// Entries
    pub size: usize,
    /// Counter width in bits
    pub bits: u8,
}

impl Default for CounterTableConfig {
    fn default() -> Self {
        Self {
            size: defaults::COUNTER_TABLE_SIZE,
            bits: defaults::COUNTER_BITS,
        }
    }
}

/// Two-level adaptive predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwoLevelConfig {
    /// Local history registers
    pub l1_size: usize,
    /// Pattern table entries
    pub l2_size: usize,
    /// Local history length
    pub history_size: u32,
    /// Counter width in bits
    pub bits: u8,
}

impl Default for TwoLevelConfig {
    fn default() -> Self {
        Self {
            l1_size: defaults::L1_SIZE,
            l2_size: defaults::COUNTER_TABLE_SIZE,
            history_size: defaults::HISTORY_SIZE,
            bits: defaults::COUNTER_BITS,
        }
    }
}

/// Hybrid (local/global with meta) predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Local (PC-indexed) table entries
    pub local_size: usize,
    /// Global (history-indexed) table entries
    pub global_size: usize,
    /// Meta table entries
    pub meta_size: usize,
    /// Global history length
    pub history_size: u32,
    /// Counter width in bits
    pub bits: u8,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            local_size: defaults::COUNTER_TABLE_SIZE,
            global_size: defaults::COUNTER_TABLE_SIZE,
            meta_size: defaults::COUNTER_TABLE_SIZE,
            history_size: defaults::HISTORY_SIZE + 1,
            bits: defaults::COUNTER_BITS,
        }
    }
}

/// 2Bc-gskew predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Bimodal table entries
    pub bim_size: usize,
    /// G0 table entries
    pub g0_size: usize,
    /// G0 history length
    pub g0_history: u32,
    /// G1 table entries
    pub g1_size: usize,
    /// G1 history length
    pub g1_history: u32,
    /// Meta table entries
    pub meta_size: usize,
    /// Meta history length
    pub meta_history: u32,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            bim_size: defaults::COUNTER_TABLE_SIZE,
            g0_size: defaults::COUNTER_TABLE_SIZE,
            g0_history: 7,
            g1_size: defaults::COUNTER_TABLE_SIZE,
            g1_history: 13,
            meta_size: defaults::COUNTER_TABLE_SIZE,
            meta_history: 10,
        }
    }
}

/// Yags predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YagsConfig {
    /// Bias (choice) table entries
    pub size: usize,
    /// Global history length
    pub history_size: u32,
    /// Entries per exception cache
    pub cache_size: usize,
    /// Exception cache tag width
    pub tag_bits: u32,
}

impl Default for YagsConfig {
    fn default() -> Self {
        Self {
            size: defaults::COUNTER_TABLE_SIZE,
            history_size: defaults::HISTORY_SIZE + 2,
            cache_size: defaults::YAGS_CACHE_SIZE,
            tag_bits: defaults::YAGS_TAG_BITS,
        }
    }
}

/// OGEHL predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OgehlConfig {
    /// Number of tables (the first uses no history)
    pub tables: usize,
    /// Longest history length
    pub max_history: usize,
    /// Log2 of entries per table
    pub log_size: u32,
    /// Signed counter width in bits
    pub counter_bits: u8,
}

impl Default for OgehlConfig {
    fn default() -> Self {
        Self {
            tables: defaults::OGEHL_TABLES,
            max_history: defaults::OGEHL_MAX_HISTORY,
            log_size: defaults::OGEHL_LOG_SIZE,
            counter_bits: defaults::OGEHL_COUNTER_BITS,
        }
    }
}

/// Loop predictor sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Entries
    pub size: usize,
    /// Repetitions of the same trip count before the predictor is trusted
    pub confidence: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            size: defaults::LOOP_SIZE,
            confidence: defaults::LOOP_CONFIDENCE,
        }
    }
}

/// Reference execution cluster configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Renamed-but-not-issued instruction window entries
    pub window_size: usize,
    /// Load/store queue entries (held until retire)
    pub lsq_size: usize,
    /// Instructions issued to functional units per cycle
    pub issue_width: usize,
    /// Per-class execution latencies
    pub latencies: LatencyConfig,
}

impl ClusterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_zero("cluster.window_size", self.window_size)?;
        non_zero("cluster.lsq_size", self.lsq_size)?;
        non_zero("cluster.issue_width", self.issue_width)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::WINDOW_SIZE,
            lsq_size: defaults::LSQ_SIZE,
            issue_width: defaults::ISSUE_WIDTH,
            latencies: LatencyConfig::default(),
        }
    }
}

/// Execution latency per operation class, in cycles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Integer ALU
    pub int_alu: u64,
    /// Integer multiply
    pub int_mult: u64,
    /// Integer divide
    pub int_div: u64,
    /// Floating-point add/compare
    pub fp_alu: u64,
    /// Floating-point multiply
    pub fp_mult: u64,
    /// Floating-point divide
    pub fp_div: u64,
    /// Load address generation (the data access is added by the memory system)
    pub load: u64,
    /// Store address generation
    pub store: u64,
    /// Branches and jumps
    pub branch: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            int_alu: 1,
            int_mult: 3,
            int_div: 12,
            fp_alu: 2,
            fp_mult: 4,
            fp_div: 10,
            load: 1,
            store: 1,
            branch: 1,
        }
    }
}

/// Reference memory system configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryModelConfig {
    /// Cycles from store retirement to global visibility
    pub store_latency: u64,
    /// Data cache latency added to every load
    pub load_latency: u64,
}

impl Default for MemoryModelConfig {
    fn default() -> Self {
        Self {
            store_latency: defaults::STORE_LATENCY,
            load_latency: defaults::LOAD_LATENCY,
        }
    }
}
