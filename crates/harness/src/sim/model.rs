//! Hardware model boundary.
//!
//! The processor core is an external design. The harness only sees its ports
//! through the [`SimModel`] trait:
//!
//! | port           | direction | width |
//! |----------------|-----------|-------|
//! | clock          | in        | 1     |
//! | reset          | in        | 1     |
//! | read address   | out       | 32    |
//! | read data      | in        | 32    |
//! | write address  | out       | 32    |
//! | write data     | out       | 32    |
//! | write strobe   | out       | 4     |
//! | send           | out       | 1     |
//! | data out       | out       | 8     |
//!
//! plus `eval` (settle the design for the current inputs), `finalize` and the
//! `finished` query. Any type implementing the trait can be driven, including
//! software test doubles.

use std::path::Path;

use crate::common::HarnessError;
use crate::sim::trace::WaveformSink;

/// One internal signal exposed for waveform capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSample<'a> {
    /// Hierarchical scope, e.g. `core.decode`.
    pub scope: &'a str,
    /// Signal name inside the scope.
    pub name: &'a str,
    /// Width in bits (1..=64).
    pub width: u32,
    /// Current value; bits above `width` are ignored.
    pub value: u64,
}

/// A simulated device with the fixed clock/reset/memory/UART interface.
pub trait SimModel {
    /// Drives the clock input.
    fn set_clock(&mut self, level: bool);
    /// Drives the reset input.
    fn set_reset(&mut self, level: bool);
    /// Byte address requested on the read port.
    fn read_address(&self) -> u32;
    /// Drives the read data input.
    fn set_read_data(&mut self, data: u32);
    /// Byte address on the write port.
    fn write_address(&self) -> u32;
    /// Data on the write port.
    fn write_data(&self) -> u32;
    /// Per-lane write enables (low 4 bits).
    fn write_strobe(&self) -> u8;
    /// UART send flag.
    fn send(&self) -> bool;
    /// UART output byte.
    fn data_out(&self) -> u8;
    /// Settles combinational and sequential state for the current inputs.
    fn eval(&mut self);
    /// Flushes model-side state at the end of the run.
    fn finalize(&mut self) {}
    /// Whether the model has requested the end of simulation.
    fn finished(&self) -> bool;

    /// Reports internal signals up to `depth` hierarchy levels for tracing.
    fn visit_signals(&self, _depth: u32, _visit: &mut dyn FnMut(SignalSample<'_>)) {}

    /// Opens a model-native waveform sink at `path`.
    ///
    /// `Ok(None)` selects the harness's own recorder.
    fn open_trace(
        &mut self,
        _path: &Path,
        _depth: u32,
    ) -> Result<Option<Box<dyn WaveformSink>>, HarnessError> {
        Ok(None)
    }
}

impl<M: SimModel + ?Sized> SimModel for Box<M> {
    fn set_clock(&mut self, level: bool) {
        (**self).set_clock(level);
    }
    fn set_reset(&mut self, level: bool) {
        (**self).set_reset(level);
    }
    fn read_address(&self) -> u32 {
        (**self).read_address()
    }
    fn set_read_data(&mut self, data: u32) {
        (**self).set_read_data(data);
    }
    fn write_address(&self) -> u32 {
        (**self).write_address()
    }
    fn write_data(&self) -> u32 {
        (**self).write_data()
    }
    fn write_strobe(&self) -> u8 {
        (**self).write_strobe()
    }
    fn send(&self) -> bool {
        (**self).send()
    }
    fn data_out(&self) -> u8 {
        (**self).data_out()
    }
    fn eval(&mut self) {
        (**self).eval();
    }
    fn finalize(&mut self) {
        (**self).finalize();
    }
    fn finished(&self) -> bool {
        (**self).finished()
    }
    fn visit_signals(&self, depth: u32, visit: &mut dyn FnMut(SignalSample<'_>)) {
        (**self).visit_signals(depth, visit);
    }
    fn open_trace(
        &mut self,
        path: &Path,
        depth: u32,
    ) -> Result<Option<Box<dyn WaveformSink>>, HarnessError> {
        (**self).open_trace(path, depth)
    }
}

/// A quiescent model: issues no writes, never sends, never finishes.
///
/// Used when no hardware model is linked, and as the baseline in tests. It
/// latches the read data it is given so traces show the bus being serviced.
#[derive(Debug, Clone, Default)]
pub struct IdleModel {
    clock: bool,
    reset: bool,
    read_data: u32,
    evals: u64,
    finalized: bool,
}

impl IdleModel {
    /// Creates an idle model with all inputs low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `eval` calls so far.
    pub fn evals(&self) -> u64 {
        self.evals
    }

    /// Whether `finalize` has run.
    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Last clock level driven.
    pub fn clock(&self) -> bool {
        self.clock
    }

    /// Last reset level driven.
    pub fn reset(&self) -> bool {
        self.reset
    }
}

impl SimModel for IdleModel {
    fn set_clock(&mut self, level: bool) {
        self.clock = level;
    }

    fn set_reset(&mut self, level: bool) {
        self.reset = level;
    }

    fn read_address(&self) -> u32 {
        0
    }

    fn set_read_data(&mut self, data: u32) {
        self.read_data = data;
    }

    fn write_address(&self) -> u32 {
        0
    }

    fn write_data(&self) -> u32 {
        0
    }

    fn write_strobe(&self) -> u8 {
        0
    }

    fn send(&self) -> bool {
        false
    }

    fn data_out(&self) -> u8 {
        0
    }

    fn eval(&mut self) {
        self.evals += 1;
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }

    fn finished(&self) -> bool {
        false
    }

    fn visit_signals(&self, depth: u32, visit: &mut dyn FnMut(SignalSample<'_>)) {
        if depth == 0 {
            return;
        }
        visit(SignalSample {
            scope: "idle",
            name: "read_data_q",
            width: 32,
            value: u64::from(self.read_data),
        });
    }
}
