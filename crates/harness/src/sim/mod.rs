//! Simulation control.
//!
//! This module drives the model and decides how a run ends. It provides:
//! 1. **Model:** The [`SimModel`](model::SimModel) port boundary and built-in models.
//! 2. **Loader:** Program and device-descriptor image loading.
//! 3. **Driver:** The half-cycle loop, reset sequencing and step budget.
//! 4. **Verdict:** The write-host pass/fail check.
//! 5. **Trace:** Optional waveform capture.
//! 6. **Cancel:** Host-requested early stop with a final callback.

/// Cancellation token and hook.
pub mod cancel;
/// Half-cycle simulation loop.
pub mod driver;
/// Image loading into the memory regions.
pub mod loader;
/// Model port boundary.
pub mod model;
/// Waveform capture.
pub mod trace;
/// Write-host verdict.
pub mod verdict;

/// Compiled hardware model binding.
#[cfg(feature = "verilated")]
pub mod ffi;

pub use cancel::{CancelHook, CancelToken};
pub use driver::{Driver, HaltReason, Phase, RunSummary};
pub use loader::{LoadReport, load, load_regions};
pub use model::{IdleModel, SignalSample, SimModel};
pub use trace::{PortSnapshot, TraceGuard, WaveformSink, open_trace};
pub use verdict::{Verdict, VerdictReporter};

#[cfg(feature = "trace")]
pub use trace::VcdRecorder;

#[cfg(feature = "verilated")]
pub use ffi::VerilatedModel;
