//! Cycle-driven test harness for simulated processor cores.
//!
//! This crate hosts an opaque hardware model and gives it a minimal execution
//! environment. It provides:
//! 1. **Memory:** A flat, word-addressed image loaded from a program and an
//!    optional device descriptor.
//! 2. **Bus:** One read and one byte-strobed write serviced per half-cycle.
//! 3. **Console:** Polled UART output forwarded to a host stream.
//! 4. **Driver:** Clock toggling, the reset pulse, the step budget and a
//!    progress heartbeat.
//! 5. **Verdict:** The write-host pass/fail convention of bare-metal test suites.
//! 6. **Trace:** Optional waveform capture (`trace` feature).
//!
//! A typical run:
//!
//! ```no_run
//! use std::path::Path;
//! use tbsim_core::{Config, ConsoleSink, Driver, IdleModel, MemoryImage};
//! use tbsim_core::sim::load_regions;
//!
//! # fn main() -> Result<(), tbsim_core::HarnessError> {
//! let config = Config::default();
//! let mut memory = MemoryImage::from_config(&config.memory);
//! let _ = load_regions(&mut memory, &config.memory, Path::new("prog.bin"), None)?;
//! let mut driver = Driver::new(IdleModel::new(), memory, ConsoleSink::stdout(), &config);
//! let summary = driver.run()?;
//! println!("{:?}", summary.verdict);
//! # Ok(())
//! # }
//! ```

/// Shared constants and the error type.
pub mod common;
/// Memory layout and run configuration.
pub mod config;
/// Simulator-style `+flag` arguments.
pub mod plusargs;
/// Driver loop, models, loader, verdict and tracing.
pub mod sim;
/// Memory image, bus responder and console sink.
pub mod soc;

/// Error type for every fallible harness operation.
pub use crate::common::HarnessError;
/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Plusargs recognised on the command line.
pub use crate::plusargs::Plusargs;
/// Simulation loop; construct with `Driver::new`.
pub use crate::sim::{Driver, IdleModel, RunSummary, SimModel, Verdict};
/// Memory-mapped I/O components.
pub use crate::soc::{ConsoleSink, MemoryImage};
