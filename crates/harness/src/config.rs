//! Configuration system for the harness.
//!
//! This module defines the configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** The memory layout and run constants of the reference testbench.
//! 2. **Structures:** `MemoryConfig` (image size, bases, load regions) and `RunConfig`
//!    (step budget, verdict address, trace and dump destinations).
//! 3. **Policies:** How out-of-bounds bus writes are handled.
//!
//! Configuration comes from `Config::default()`, optionally overridden by a JSON
//! document (`--config`), and finally by plusargs on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::HarnessError;

/// Default configuration constants for the harness.
mod defaults {
    /// Absolute physical address of RAM as seen by test programs.
    ///
    /// Subtracted from the `+W` write-host address before indexing the image.
    pub const RAM_BASE: u64 = 0x8000_0000;

    /// Base of the addresses the model presents on its memory bus.
    ///
    /// The reference core emits RAM-relative addresses, so this is zero.
    pub const BUS_BASE: u32 = 0;

    /// Memory image size in 32-bit words (256 MiB).
    pub const RAM_WORDS: usize = 67_108_864;

    /// Capacity of the program region in words, starting at word 0.
    pub const PROGRAM_WORDS: usize = 66_846_720;

    /// Capacity of the device-descriptor region in words (1 MiB).
    ///
    /// The region starts right after the program region, at `RAM_BASE + 0x0ff0_0000`.
    pub const DESCRIPTOR_WORDS: usize = 262_144;

    /// Half-cycles between progress heartbeats.
    pub const HEARTBEAT_INTERVAL: u64 = 1_000_000;

    /// Directory receiving waveform traces.
    pub const TRACE_DIR: &str = "logs";

    /// File name of the waveform trace inside `TRACE_DIR`.
    pub const TRACE_FILE: &str = "vlt_dump.vcd";

    /// Destination of raw memory dumps.
    pub const DUMP_FILE: &str = "mem.bin";
}

/// What the bus responder does with a write outside the memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OutOfBoundsPolicy {
    /// Log a warning, count the access and skip the write.
    #[default]
    Warn,
    /// Stop the run with [`HarnessError::OutOfBounds`].
    Fatal,
}

/// A contiguous range of the memory image, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First word of the region.
    pub offset_words: usize,
    /// Maximum number of words the region may hold.
    pub max_words: usize,
}

impl Region {
    /// One past the last word of the region, or `None` if that overflows.
    pub const fn end(&self) -> Option<usize> {
        self.offset_words.checked_add(self.max_words)
    }
}

/// Root configuration type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Memory image layout.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Run control.
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Parses a JSON document; omitted fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Config`] for malformed JSON, [`HarnessError::InvalidConfig`]
    /// if the layout does not validate.
    pub fn from_json(text: &str) -> Result<Self, HarnessError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Load`] if the file cannot be read, otherwise as
    /// [`Config::from_json`].
    pub fn from_json_file(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| HarnessError::load(path, e))?;
        Self::from_json(&text)
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// See [`MemoryConfig::validate`].
    pub fn validate(&self) -> Result<(), HarnessError> {
        self.memory.validate()
    }
}

/// Memory image layout.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Absolute RAM base used to normalize the write-host address.
    #[serde(default = "MemoryConfig::default_ram_base")]
    pub ram_base: u64,

    /// Bus address that maps to word 0 of the image.
    #[serde(default = "MemoryConfig::default_bus_base")]
    pub bus_base: u32,

    /// Image size in words.
    #[serde(default = "MemoryConfig::default_ram_words")]
    pub ram_words: usize,

    /// Program region capacity in words.
    #[serde(default = "MemoryConfig::default_program_words")]
    pub program_words: usize,

    /// Device-descriptor region capacity in words.
    #[serde(default = "MemoryConfig::default_descriptor_words")]
    pub descriptor_words: usize,
}

impl MemoryConfig {
    fn default_ram_base() -> u64 {
        defaults::RAM_BASE
    }

    fn default_bus_base() -> u32 {
        defaults::BUS_BASE
    }

    fn default_ram_words() -> usize {
        defaults::RAM_WORDS
    }

    fn default_program_words() -> usize {
        defaults::PROGRAM_WORDS
    }

    fn default_descriptor_words() -> usize {
        defaults::DESCRIPTOR_WORDS
    }

    /// A layout of `ram_words` words split into program and descriptor regions.
    pub fn with_layout(ram_words: usize, program_words: usize, descriptor_words: usize) -> Self {
        Self {
            ram_words,
            program_words,
            descriptor_words,
            ..Self::default()
        }
    }

    /// Program region; always starts at word 0.
    pub const fn program_region(&self) -> Region {
        Region {
            offset_words: 0,
            max_words: self.program_words,
        }
    }

    /// Device-descriptor region; starts at the end of the program region.
    pub const fn descriptor_region(&self) -> Region {
        Region {
            offset_words: self.program_words,
            max_words: self.descriptor_words,
        }
    }

    /// Checks that the image is non-empty and both regions fit inside it.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`] naming the offending layout.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.ram_words == 0 {
            return Err(HarnessError::InvalidConfig(
                "memory.ram_words must be non-zero".into(),
            ));
        }
        let end = self.descriptor_region().end().ok_or_else(|| {
            HarnessError::InvalidConfig(format!(
                "load regions of {} + {} words overflow the address space",
                self.program_words, self.descriptor_words
            ))
        })?;
        if end > self.ram_words {
            return Err(HarnessError::InvalidConfig(format!(
                "load regions end at word {end}, past the {}-word image",
                self.ram_words
            )));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_base: defaults::RAM_BASE,
            bus_base: defaults::BUS_BASE,
            ram_words: defaults::RAM_WORDS,
            program_words: defaults::PROGRAM_WORDS,
            descriptor_words: defaults::DESCRIPTOR_WORDS,
        }
    }
}

/// Run control settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Step budget in half-cycles; 0 runs until the model finishes.
    #[serde(default)]
    pub max_time: u64,

    /// Absolute address checked for the pass sentinel after the run.
    #[serde(default)]
    pub write_host: Option<u64>,

    /// Record a waveform trace (requires the `trace` feature).
    #[serde(default)]
    pub trace: bool,

    /// Directory receiving the waveform trace; created if missing.
    #[serde(default = "RunConfig::default_trace_dir")]
    pub trace_dir: PathBuf,

    /// Waveform file name inside `trace_dir`.
    #[serde(default = "RunConfig::default_trace_file")]
    pub trace_file: String,

    /// Half-cycles between progress heartbeats; 0 disables them.
    #[serde(default = "RunConfig::default_heartbeat")]
    pub heartbeat_interval: u64,

    /// Handling of writes outside the memory image.
    #[serde(default)]
    pub out_of_bounds: OutOfBoundsPolicy,

    /// Destination of raw memory dumps.
    #[serde(default = "RunConfig::default_dump_path")]
    pub dump_path: PathBuf,
}

impl RunConfig {
    fn default_trace_dir() -> PathBuf {
        PathBuf::from(defaults::TRACE_DIR)
    }

    fn default_trace_file() -> String {
        defaults::TRACE_FILE.to_string()
    }

    fn default_heartbeat() -> u64 {
        defaults::HEARTBEAT_INTERVAL
    }

    fn default_dump_path() -> PathBuf {
        PathBuf::from(defaults::DUMP_FILE)
    }

    /// Step budget, or `None` when the run is unbounded.
    pub const fn budget(&self) -> Option<u64> {
        if self.max_time == 0 {
            None
        } else {
            Some(self.max_time)
        }
    }

    /// Full path of the waveform trace.
    pub fn trace_path(&self) -> PathBuf {
        self.trace_dir.join(&self.trace_file)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_time: 0,
            write_host: None,
            trace: false,
            trace_dir: Self::default_trace_dir(),
            trace_file: Self::default_trace_file(),
            heartbeat_interval: defaults::HEARTBEAT_INTERVAL,
            out_of_bounds: OutOfBoundsPolicy::default(),
            dump_path: Self::default_dump_path(),
        }
    }
}
