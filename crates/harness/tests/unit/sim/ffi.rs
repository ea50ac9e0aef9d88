//! # Compiled Model Tests
//!
//! Drives the verilated model through the C wrapper. Only one instance may
//! be alive at a time, so everything runs inside a single test.

use pretty_assertions::assert_eq;
use tbsim_core::sim::{HaltReason, Phase, VerilatedModel};
use tbsim_core::SimModel;

use crate::common::harness::{bench, small_config};

#[test]
fn verilated_model_runs_a_bounded_session() {
    let model = VerilatedModel::new().expect("wrapper failed to allocate the model");
    assert!(!model.finished());

    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(40);
    config.run.trace = true;
    config.run.trace_dir = dir.path().join("logs");
    let mut driver = bench(model, &config);
    let traced = driver.enable_trace().unwrap();

    let summary = driver.run().unwrap();
    assert_eq!(driver.phase(), Phase::Halted);
    if summary.reason == HaltReason::BudgetExhausted {
        assert_eq!(summary.time, 41);
    }
    drop(driver);

    if cfg!(feature = "trace") {
        assert!(traced);
        let wave = std::fs::metadata(config.run.trace_path()).unwrap();
        assert!(wave.len() > 0);
    }
}
