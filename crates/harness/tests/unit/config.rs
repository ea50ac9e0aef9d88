//! # Configuration Tests
//!
//! Defaults, JSON overrides and layout validation.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tbsim_core::HarnessError;
use tbsim_core::config::*;

use crate::common::harness::temp_image;

#[test]
fn test_memory_config_defaults() {
    let memory = MemoryConfig::default();
    assert_eq!(memory.ram_base, 0x8000_0000);
    assert_eq!(memory.bus_base, 0);
    assert_eq!(memory.ram_words, 67_108_864);
    assert_eq!(memory.program_words, 66_846_720);
    assert_eq!(memory.descriptor_words, 262_144);
}

#[test]
fn test_default_regions() {
    let memory = MemoryConfig::default();
    assert_eq!(
        memory.program_region(),
        Region {
            offset_words: 0,
            max_words: 66_846_720
        }
    );
    let descriptor = memory.descriptor_region();
    assert_eq!(descriptor.offset_words, 66_846_720);
    assert_eq!(descriptor.end(), Some(memory.ram_words));
    // Descriptor sits at 0x8ff0_0000 in the program's address space.
    assert_eq!(
        memory.ram_base + (descriptor.offset_words as u64) * 4,
        0x8ff0_0000
    );
}

#[test]
fn test_regions_are_adjacent() {
    let memory = MemoryConfig::with_layout(64, 48, 16);
    let program = memory.program_region();
    let descriptor = memory.descriptor_region();
    assert_eq!(program.end(), Some(descriptor.offset_words));
    assert_eq!(descriptor.end(), Some(64));
}

#[test]
fn test_region_end_overflow_is_none() {
    let region = Region {
        offset_words: 1,
        max_words: usize::MAX,
    };
    assert_eq!(region.end(), None);
}

#[test]
fn test_run_config_defaults() {
    let run = RunConfig::default();
    assert_eq!(run.max_time, 0);
    assert_eq!(run.budget(), None);
    assert_eq!(run.write_host, None);
    assert!(!run.trace);
    assert_eq!(run.trace_path(), PathBuf::from("logs/vlt_dump.vcd"));
    assert_eq!(run.heartbeat_interval, 1_000_000);
    assert_eq!(run.out_of_bounds, OutOfBoundsPolicy::Warn);
    assert_eq!(run.dump_path, PathBuf::from("mem.bin"));
}

#[test]
fn test_budget_is_none_only_for_zero() {
    let mut run = RunConfig::default();
    run.max_time = 20;
    assert_eq!(run.budget(), Some(20));
}

#[test]
fn test_empty_json_is_default() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.memory.ram_words, MemoryConfig::default().ram_words);
    assert_eq!(config.run.max_time, 0);
}

#[test]
fn test_partial_json_overrides() {
    let config = Config::from_json(
        r#"{
            "memory": { "ram_words": 1024, "program_words": 768, "descriptor_words": 256 },
            "run": { "max_time": 500, "write_host": 2147487744, "out_of_bounds": "Fatal" }
        }"#,
    )
    .unwrap();
    assert_eq!(config.memory.ram_words, 1024);
    assert_eq!(config.memory.ram_base, 0x8000_0000);
    assert_eq!(config.run.max_time, 500);
    assert_eq!(config.run.write_host, Some(0x8000_1000));
    assert_eq!(config.run.out_of_bounds, OutOfBoundsPolicy::Fatal);
    assert_eq!(config.run.heartbeat_interval, 1_000_000);
}

#[test]
fn test_malformed_json_is_config_error() {
    let err = Config::from_json("{ memory: ").unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
}

#[test]
fn test_zero_ram_is_rejected() {
    let err = Config::from_json(r#"{ "memory": { "ram_words": 0 } }"#).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidConfig(_)));
}

#[test]
fn test_regions_past_image_are_rejected() {
    let memory = MemoryConfig::with_layout(64, 60, 16);
    let err = memory.validate().unwrap_err();
    assert!(err.to_string().contains("76"), "{err}");
}

#[test]
fn test_overflowing_regions_are_rejected() {
    let err = Config::from_json(r#"{ "memory": { "program_words": 18446744073709551615 } }"#)
        .unwrap_err();
    assert!(matches!(err, HarnessError::InvalidConfig(_)), "{err}");
}

#[test]
fn test_from_json_file() {
    let file = temp_image(br#"{ "run": { "trace": true, "trace_dir": "waves" } }"#);
    let config = Config::from_json_file(file.path()).unwrap();
    assert!(config.run.trace);
    assert_eq!(config.run.trace_path(), PathBuf::from("waves/vlt_dump.vcd"));
}

#[test]
fn test_missing_json_file_is_load_error() {
    let err = Config::from_json_file(Path::new("/nonexistent/tbsim.json")).unwrap_err();
    assert!(matches!(err, HarnessError::Load { .. }));
}
