//! Configuration and Trace Files.
//!
//! Loads configurations and traces from real files and checks that invalid
//! documents are rejected before any simulation starts.

use std::io::Write;

use ooosim_core::common::{ConfigError, FlowId, TraceError};
use ooosim_core::config::{PredictorKind, SimConfig};
use ooosim_core::sim::TraceSource;
use ooosim_core::core::OooProcessor;
use ooosim_core::sim::FixedLatencyCluster;
use ooosim_core::stats::NullStats;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ══════════════════════════════════════════════════════════
// 1. Configuration
// ══════════════════════════════════════════════════════════

#[test]
fn config_file_overrides_selected_fields() {
    let file = write_temp(
        r#"{
            "pipeline": { "fetch_width": 2, "max_rob_size": 64, "serialize_level": 3 },
            "bpred": { "pred1": "2bit", "pred2": "Yags", "btb_size": 512 },
            "cluster": { "window_size": 16 },
            "memory": { "store_latency": 9 }
        }"#,
    );
    let config = SimConfig::from_file(file.path()).unwrap();
    assert_eq!(config.pipeline.fetch_width, 2);
    assert_eq!(config.pipeline.max_rob_size, 64);
    assert_eq!(config.pipeline.serialize_level, 3);
    assert_eq!(config.pipeline.retire_width, SimConfig::default().pipeline.retire_width);
    assert_eq!(config.bpred.pred1, PredictorKind::TwoBit);
    assert_eq!(config.bpred.pred2, Some(PredictorKind::Yags));
    assert_eq!(config.bpred.btb_size, 512);
    assert_eq!(config.cluster.window_size, 16);
    assert_eq!(config.memory.store_latency, 9);
}

#[test]
fn config_file_with_bad_table_size_is_rejected() {
    let file = write_temp(r#"{ "bpred": { "btb_size": 1000 } }"#);
    let err = SimConfig::from_file(file.path()).unwrap_err();
    assert!(
        matches!(err, ConfigError::NotPowerOfTwo { field: "bpred.btb_size", value: 1000 }),
        "unexpected error: {err}"
    );
}

#[test]
fn config_zero_width_is_rejected() {
    let err = SimConfig::from_json(r#"{ "pipeline": { "retire_width": 0 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Zero(_)), "unexpected error: {err}");
}

#[test]
fn config_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SimConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn config_malformed_json_is_parse_error() {
    let file = write_temp("{ pipeline: ");
    assert!(matches!(SimConfig::from_file(file.path()), Err(ConfigError::Parse(_))));
}

/// Every counter table width is bounded, whichever predictor owns it.
#[rstest]
#[case::two_level_wide(r#"{ "bpred": { "pred1": "TwoLevel", "two_level": { "bits": 8 } } }"#, "bpred.two_level.bits")]
#[case::two_level_zero(r#"{ "bpred": { "two_level": { "bits": 0 } } }"#, "bpred.two_level.bits")]
#[case::hybrid_wide(r#"{ "bpred": { "pred1": "Hybrid", "hybrid": { "bits": 8 } } }"#, "bpred.hybrid.bits")]
#[case::hybrid_zero(r#"{ "bpred": { "hybrid": { "bits": 0 } } }"#, "bpred.hybrid.bits")]
fn config_counter_width_out_of_range_is_rejected(#[case] json: &str, #[case] expected: &str) {
    let err = SimConfig::from_json(json).unwrap_err();
    assert!(
        matches!(err, ConfigError::OutOfRange { field, .. } if field == expected),
        "unexpected error: {err}"
    );
}

#[test]
fn engine_refuses_config_with_oversized_counters() {
    let mut config = SimConfig::default();
    config.bpred.pred1 = PredictorKind::Hybrid;
    config.bpred.hybrid.bits = 8;
    let built = OooProcessor::new(FlowId(0), &config, FixedLatencyCluster::new(&config.cluster), NullStats);
    assert!(matches!(built, Err(ConfigError::OutOfRange { field: "bpred.hybrid.bits", .. })));
}

// ══════════════════════════════════════════════════════════
// 2. Traces
// ══════════════════════════════════════════════════════════

#[test]
fn trace_file_round_trips_through_source() {
    let file = write_temp(
        r#"{ "flows": [
            [ { "pc": 256, "op": "Load", "regs": { "src1": 2, "dst": 5 }, "mem_addr": 4096 },
              { "pc": 260, "op": "Branch", "regs": { "src1": 5 }, "next_pc": 256 } ],
            [ { "pc": 512, "op": "FpMult", "regs": { "src1": 33, "src2": 34, "dst": 35 } } ]
        ] }"#,
    );
    let source = TraceSource::from_file(file.path()).unwrap();
    assert_eq!(source.flows(), 2);
    assert_eq!(source.remaining(FlowId(0)), 2);
    assert_eq!(source.remaining(FlowId(1)), 1);
}

#[test]
fn trace_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TraceSource::from_file(dir.path().join("missing.json")),
        Err(TraceError::Io(_))
    ));
}
