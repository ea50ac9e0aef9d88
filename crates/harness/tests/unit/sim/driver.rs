//! # Driver Tests
//!
//! The half-cycle sequence, reset pulse, termination conditions, shutdown
//! ordering and the end-to-end scenarios of a bare-metal test run.

use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tbsim_core::config::OutOfBoundsPolicy;
use tbsim_core::sim::{HaltReason, Phase, Verdict, load_regions};
use tbsim_core::{HarnessError, IdleModel, MemoryImage};

use crate::common::harness::{PROGRAM_WORDS, bench, console_text, small_config, temp_image};
use crate::common::mocks::model::{MockModel, ScriptedModel, Store};
use crate::common::mocks::sink::{RecordingSink, SinkEvent, closes, samples};

const RAM_BASE: u64 = 0x8000_0000;

// ══════════════════════════════════════════════════════════
// 1. Half-cycle sequence
// ══════════════════════════════════════════════════════════

#[test]
fn initial_state() {
    let driver = bench(IdleModel::new(), &small_config(0));
    assert_eq!(driver.time(), 0);
    assert!(!driver.clock());
    assert!(!driver.reset());
    assert_eq!(driver.phase(), Phase::Resetting);
}

#[test]
fn clock_toggles_every_step() {
    let mut driver = bench(IdleModel::new(), &small_config(0));
    for t in 1..=6u64 {
        driver.step().unwrap();
        assert_eq!(driver.time(), t);
        assert_eq!(driver.clock(), t % 2 == 1);
        assert_eq!(driver.model().clock(), driver.clock());
    }
    assert_eq!(driver.model().evals(), 6);
}

#[test]
fn reset_pulse_up_to_1000() {
    let mut driver = bench(ScriptedModel::new(), &small_config(0));
    for _ in 0..1000 {
        driver.step().unwrap();
    }
    let resets = &driver.model().resets;
    assert_eq!(resets.len(), 1000);
    for (i, &level) in resets.iter().enumerate() {
        let time = i as u64 + 1;
        assert_eq!(level, (2..=9).contains(&time), "reset at time {time}");
    }
}

#[test]
fn phase_leaves_reset_at_ten() {
    let mut driver = bench(IdleModel::new(), &small_config(0));
    for _ in 0..9 {
        driver.step().unwrap();
    }
    assert_eq!(driver.phase(), Phase::Resetting);
    driver.step().unwrap();
    assert_eq!(driver.phase(), Phase::Running);
    assert!(!driver.reset());
}

#[test]
fn read_data_comes_from_memory() {
    let mut model = MockModel::new();
    model.expect_set_clock().return_const(());
    model.expect_set_reset().return_const(());
    model.expect_read_address().return_const(8u32);
    model.expect_write_address().return_const(0u32);
    model.expect_write_data().return_const(0u32);
    model.expect_write_strobe().return_const(0u8);
    model.expect_send().return_const(false);
    model.expect_data_out().return_const(0u8);
    model.expect_finished().return_const(false);
    model
        .expect_set_read_data()
        .with(eq(0xDEAD_BEEF))
        .times(4)
        .return_const(());
    model.expect_eval().times(4).return_const(());
    model.expect_finalize().times(1).return_const(());

    let mut driver = bench(model, &small_config(3));
    *driver.memory_mut().word_mut(2).unwrap() = 0xDEAD_BEEF;
    let summary = driver.run().unwrap();
    assert_eq!(summary.time, 4);
    assert_eq!(summary.reason, HaltReason::BudgetExhausted);
}

#[test]
fn writes_land_in_memory() {
    let model = ScriptedModel::new().with_stores([
        Store::new(0x10, 0xCAFE_F00D, 0b1111),
        Store::new(0x14, 0x0000_00AB, 0b0001),
    ]);
    let mut driver = bench(model, &small_config(10));
    let summary = driver.run().unwrap();
    assert_eq!(summary.refused_writes, 0);
    assert_eq!(driver.memory().word(4), 0xCAFE_F00D);
    assert_eq!(driver.memory().word(5), 0x0000_00AB);
}

#[test]
fn write_is_visible_to_next_read() {
    let model = ScriptedModel::new()
        .reading(0x20)
        .with_stores([Store::new(0x20, 0x1234_5678, 0b1111)]);
    let mut driver = bench(model, &small_config(3));
    driver.run().unwrap();
    // Step 1 services no write, step 2 reads then writes, step 3 sees the value.
    assert_eq!(driver.model().read_data, vec![0, 0, 0x1234_5678, 0x1234_5678]);
}

// ══════════════════════════════════════════════════════════
// 2. Termination
// ══════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn budget_halts_at_budget_plus_one(budget in 1u64..300) {
        let mut driver = bench(IdleModel::new(), &small_config(budget));
        let summary = driver.run().unwrap();
        prop_assert_eq!(summary.reason, HaltReason::BudgetExhausted);
        prop_assert_eq!(summary.time, budget + 1);
        prop_assert_eq!(driver.model().evals(), budget + 1);
    }
}

#[test]
fn unbounded_run_ends_only_on_finish() {
    let model = ScriptedModel::new().finishing_after(5000);
    let mut driver = bench(model, &small_config(0));
    let summary = driver.run().unwrap();
    assert_eq!(summary.reason, HaltReason::Finished);
    assert_eq!(summary.time, 5000);
}

#[test]
fn finish_beats_budget() {
    let model = ScriptedModel::new().finishing_after(7);
    let mut driver = bench(model, &small_config(100));
    let summary = driver.run().unwrap();
    assert_eq!(summary.reason, HaltReason::Finished);
    assert_eq!(summary.time, 7);
}

#[test]
fn model_finished_before_first_step() {
    let model = ScriptedModel::new().finishing_after(0);
    let mut driver = bench(model, &small_config(100));
    let summary = driver.run().unwrap();
    assert_eq!(summary.time, 0);
    assert_eq!(driver.model().evals, 0);
    assert_eq!(driver.model().finalized, 1);
}

// ══════════════════════════════════════════════════════════
// 3. Shutdown
// ══════════════════════════════════════════════════════════

#[test]
fn shutdown_finalizes_once() {
    let mut driver = bench(ScriptedModel::new(), &small_config(4));
    let first = driver.run().unwrap();
    assert_eq!(driver.phase(), Phase::Halted);
    assert_eq!(driver.model().finalized, 1);

    let second = driver.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(driver.model().finalized, 1);

    driver.step().unwrap();
    assert_eq!(driver.time(), first.time);
}

#[test]
fn trace_sampled_each_step_and_closed_once() {
    let (sink, log) = RecordingSink::new();
    let mut driver = bench(IdleModel::new(), &small_config(9));
    driver.attach_trace(Box::new(sink));
    let summary = driver.run().unwrap();

    assert_eq!(samples(&log), summary.time as usize);
    assert_eq!(closes(&log), 1);
    assert_eq!(
        log.borrow()[2],
        SinkEvent::Sample {
            time: 3,
            clock: true,
            reset: true
        }
    );
    drop(driver);
    assert_eq!(closes(&log), 1);
}

#[test]
fn fatal_write_still_finalizes_and_closes() {
    let (sink, log) = RecordingSink::new();
    let model = ScriptedModel::new().with_stores([
        Store::new(0, 1, 0b0001),
        Store::new(0x1_0000, 1, 0b0001),
    ]);
    let mut config = small_config(50);
    config.run.out_of_bounds = OutOfBoundsPolicy::Fatal;
    let mut driver = bench(model, &config);
    driver.attach_trace(Box::new(sink));

    let err = driver.run().unwrap_err();
    assert!(matches!(err, HarnessError::OutOfBounds { .. }));
    assert_eq!(driver.time(), 3);
    assert_eq!(driver.phase(), Phase::Halted);
    assert_eq!(driver.model().finalized, 1);
    assert_eq!(closes(&log), 1);
    assert_eq!(driver.memory().word(0), 1);
}

#[test]
fn rerun_after_failure_returns_without_stepping() {
    let model = ScriptedModel::new().with_stores([Store::new(0x1_0000, 1, 0b0001)]);
    let mut config = small_config(50);
    config.run.out_of_bounds = OutOfBoundsPolicy::Fatal;
    let mut driver = bench(model, &config);

    assert!(driver.run().is_err());
    let halted_at = driver.time();

    let summary = driver.run().unwrap();
    assert_eq!(summary.reason, HaltReason::Failed);
    assert_eq!(summary.time, halted_at);
    assert_eq!(driver.time(), halted_at);
    assert_eq!(driver.model().finalized, 1);
}

#[test]
fn trace_failure_aborts_run() {
    let (mut sink, log) = RecordingSink::new();
    sink.fail_at = Some(5);
    let mut driver = bench(ScriptedModel::new(), &small_config(50));
    driver.attach_trace(Box::new(sink));
    let err = driver.run().unwrap_err();
    assert!(matches!(err, HarnessError::Trace(_)));
    assert_eq!(driver.time(), 5);
    assert_eq!(driver.model().finalized, 1);
    assert_eq!(closes(&log), 1);
}

#[test]
fn warn_policy_counts_refused_writes() {
    let model = ScriptedModel::new().with_stores([
        Store::new(0x4000, 1, 0b1111),
        Store::new(0x4004, 1, 0b1111),
        Store::new(0x4008, 1, 0b0000),
    ]);
    let mut driver = bench(model, &small_config(10));
    let summary = driver.run().unwrap();
    assert_eq!(summary.refused_writes, 2);
    assert!(driver.memory().words().iter().all(|&w| w == 0));
}

// ══════════════════════════════════════════════════════════
// 4. Console
// ══════════════════════════════════════════════════════════

#[test]
fn held_send_is_emitted_on_every_high_step() {
    let model = ScriptedModel::new().holding_send(b'A');
    let mut driver = bench(model, &small_config(5));
    let summary = driver.run().unwrap();
    // Times 1, 3 and 5 have the clock high; the budget stops after time 6.
    assert_eq!(summary.console_bytes, 3);
    assert_eq!(console_text(&driver), "AAA");
}

#[test]
fn console_text_is_flushed_at_halt() {
    // A byte popped by eval n is sampled on step n + 1, which has the clock
    // high only when n is even.
    let text = b"ok\n";
    let sends = text.iter().flat_map(|&b| [None, Some(b)]);
    let model = ScriptedModel::new().with_sends(sends);
    let mut driver = bench(model, &small_config(8));
    let summary = driver.run().unwrap();
    assert_eq!(summary.console_bytes, 3);
    assert_eq!(console_text(&driver), "ok\n");
}

// ══════════════════════════════════════════════════════════
// 5. Bare-metal scenarios
// ══════════════════════════════════════════════════════════

#[test]
fn zero_program_budget_twenty() {
    let program = temp_image(&[0, 0, 0, 0]);
    let config = small_config(20);
    let mut memory = MemoryImage::from_config(&config.memory);
    load_regions(&mut memory, &config.memory, program.path(), None).unwrap();

    let mut driver = bench(IdleModel::new(), &config);
    *driver.memory_mut() = memory;
    let summary = driver.run().unwrap();

    assert_eq!(summary.time, 21);
    assert_eq!(summary.reason, HaltReason::BudgetExhausted);
    assert_eq!(summary.verdict, Verdict::Unchecked);
    assert_eq!(driver.memory().word(0), 0);
    assert!(driver.memory().words()[PROGRAM_WORDS..].iter().all(|&w| w == 0));
}

#[test]
fn strobed_store_updates_lanes_zero_and_two() {
    let model = ScriptedModel::new().with_stores([Store::new(4, 0xAABB_CCDD, 0b0101)]);
    let mut driver = bench(model, &small_config(4));
    *driver.memory_mut().word_mut(1).unwrap() = 0x1122_3344;
    driver.run().unwrap();
    assert_eq!(driver.memory().word(1), 0x11BB_33DD);
}

#[test]
fn write_host_pass() {
    let mut config = small_config(20);
    config.run.write_host = Some(RAM_BASE);
    let model = ScriptedModel::new().with_stores([Store::new(0, 1, 0b1111)]);
    let mut driver = bench(model, &config);
    let summary = driver.run().unwrap();
    assert_eq!(summary.verdict, Verdict::Pass { value: 1 });
}

#[test]
fn write_host_mismatch() {
    let mut config = small_config(20);
    config.run.write_host = Some(RAM_BASE);
    let mut driver = bench(IdleModel::new(), &config);
    let summary = driver.run().unwrap();
    assert_eq!(
        summary.verdict,
        Verdict::Mismatch {
            expected: 1,
            got: 0
        }
    );
}

#[test]
fn into_parts_returns_final_state() {
    let model = ScriptedModel::new()
        .with_stores([Store::new(8, 0x55, 0b0001)])
        .holding_send(b'z');
    let mut driver = bench(model, &small_config(2));
    driver.run().unwrap();
    let (model, memory, console) = driver.into_parts();
    assert_eq!(model.finalized, 1);
    assert_eq!(memory.word(2), 0x55);
    assert_eq!(console.into_inner().unwrap(), b"zz");
}
