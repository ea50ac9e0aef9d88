//! Harness error definitions.
//!
//! This module defines the single error type used across the harness. It covers:
//! 1. **Loading:** Program and device-descriptor images that cannot be read.
//! 2. **Bus faults:** Model-supplied write addresses outside the memory image.
//! 3. **I/O sinks:** Console, waveform and memory-dump failures.
//! 4. **Configuration:** Malformed JSON, inconsistent layouts and bad plusargs.
//!
//! Whether a variant is fatal is decided by the caller: a `Load` error for the
//! program image aborts the run, the same error for the descriptor is logged
//! and the run continues.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An image file could not be opened or read.
    #[error("could not read image '{}': {source}", .path.display())]
    Load {
        /// Path of the image file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No program image (`+B<path>`) was supplied.
    #[error("no binary file specified")]
    MissingProgram,

    /// The model issued a write outside the memory image.
    ///
    /// Only raised under [`OutOfBoundsPolicy::Fatal`](crate::config::OutOfBoundsPolicy::Fatal);
    /// the default policy logs and skips the write.
    #[error("write to {address:#010x} (word {index}) is outside the {words}-word memory image")]
    OutOfBounds {
        /// Byte address presented on the bus.
        address: u32,
        /// Word index derived from the address.
        index: usize,
        /// Size of the memory image in words.
        words: usize,
    },

    /// The waveform sink could not be created, written or closed.
    #[error("waveform trace failed: {0}")]
    Trace(#[source] io::Error),

    /// The memory dump file could not be written.
    #[error("could not dump memory to '{}': {source}", .path.display())]
    Dump {
        /// Destination path of the dump.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing to the console stream failed.
    #[error("console output failed: {0}")]
    Console(#[source] io::Error),

    /// A JSON configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration was parsed but is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A plusarg carried a value that could not be parsed.
    #[error("invalid value '{value}' for +{flag}")]
    Plusarg {
        /// Flag letter or name (`T`, `W`, ...).
        flag: &'static str,
        /// Raw value following the flag.
        value: String,
    },
}

impl HarnessError {
    /// Wraps an I/O error raised while loading `path`.
    pub fn load(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }
}
