//! Simulation Driver.
//!
//! This module owns simulated time and the per-half-cycle sequence. Each
//! [`Driver::step`]:
//! 1. **Advances time:** Increments the counter and flips the clock.
//! 2. **Sequences reset:** Drives reset high for times 2 through 9.
//! 3. **Services the bus:** Reads and writes the memory image for the request
//!    the model settled on during the previous evaluation.
//! 4. **Feeds the console:** Takes a byte if `send` is high while the clock is.
//! 5. **Evaluates:** Settles the model and samples the waveform, if any.
//!
//! [`Driver::run`] repeats this until the model finishes, the step budget is
//! spent, or the cancel hook fires, then shuts down in a fixed order: finalize
//! the model, flush the console, close the trace, run the cancel callback and
//! report the verdict.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::common::constants::RESET_RELEASE_AT;
use crate::common::{HarnessError, reset_asserted};
use crate::config::{Config, RunConfig};
use crate::sim::cancel::CancelHook;
use crate::sim::model::SimModel;
use crate::sim::trace::{self, PortSnapshot, TraceGuard, WaveformSink};
use crate::sim::verdict::{Verdict, VerdictReporter};
use crate::soc::{BusRequest, BusResponder, ConsoleSink, MemoryImage};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before reset has been released (time < 10).
    Resetting,
    /// Reset released, stepping.
    Running,
    /// Shut down; the model has been finalized.
    Halted,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The model reported it was finished.
    Finished,
    /// Simulated time passed the step budget.
    BudgetExhausted,
    /// The cancel token was set.
    Cancelled,
    /// A step or the shutdown failed; the error was returned by that run.
    Failed,
}

/// Result of [`Driver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Simulated time at halt.
    pub time: u64,
    /// Why the run stopped.
    pub reason: HaltReason,
    /// Write-host check outcome.
    pub verdict: Verdict,
    /// Bytes the model sent to the console.
    pub console_bytes: u64,
    /// Bus writes refused for falling outside the memory image.
    pub refused_writes: u64,
}

/// Top-level simulation loop around one model.
#[derive(Debug)]
pub struct Driver<M: SimModel, W: Write> {
    // Dropped before the model so a native sink never outlives it.
    trace: Option<TraceGuard>,
    model: M,
    memory: MemoryImage,
    bus: BusResponder,
    console: ConsoleSink<W>,
    run: RunConfig,
    verdict: VerdictReporter,
    cancel: Option<CancelHook>,
    time: u64,
    clock: bool,
    reset: bool,
    phase: Phase,
    halt: Option<HaltReason>,
    finalized: bool,
}

impl<M: SimModel, W: Write> Driver<M, W> {
    /// Creates a driver at time 0 with clock and reset low.
    ///
    /// `memory` should already hold the loaded images.
    pub fn new(model: M, memory: MemoryImage, console: ConsoleSink<W>, config: &Config) -> Self {
        Self {
            trace: None,
            model,
            memory,
            bus: BusResponder::new(config.run.out_of_bounds),
            console,
            run: config.run.clone(),
            verdict: VerdictReporter::new(config.run.write_host, config.memory.ram_base),
            cancel: None,
            time: 0,
            clock: false,
            reset: false,
            phase: Phase::Resetting,
            halt: None,
            finalized: false,
        }
    }

    /// Opens the waveform trace if the run configuration asks for one.
    ///
    /// Returns whether a trace is now being recorded.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Trace`] if the sink cannot be created.
    pub fn enable_trace(&mut self) -> Result<bool, HarnessError> {
        if let Some(guard) = trace::open_trace(&mut self.model, &self.run)? {
            self.trace = Some(guard);
        }
        Ok(self.trace.is_some())
    }

    /// Records every following step into `sink`, replacing any open trace.
    pub fn attach_trace(&mut self, sink: Box<dyn WaveformSink>) {
        self.trace = Some(TraceGuard::new(sink));
    }

    /// Installs the hook polled once per step.
    pub fn set_cancel_hook(&mut self, hook: CancelHook) {
        self.cancel = Some(hook);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Simulated time in half-cycles.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Level last driven on the clock input.
    pub fn clock(&self) -> bool {
        self.clock
    }

    /// Level last driven on the reset input.
    pub fn reset(&self) -> bool {
        self.reset
    }

    /// The memory image.
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Mutable access to the memory image.
    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        &mut self.memory
    }

    /// The driven model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the driven model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The console sink.
    pub fn console(&self) -> &ConsoleSink<W> {
        &self.console
    }

    /// Bus writes refused so far.
    pub fn refused_writes(&self) -> u64 {
        self.bus.refused_writes()
    }

    /// Returns the reason the loop would stop now, if any.
    ///
    /// Cancellation wins over the other conditions.
    pub fn should_halt(&self) -> Option<HaltReason> {
        if self.cancel.as_ref().is_some_and(CancelHook::is_cancelled) {
            Some(HaltReason::Cancelled)
        } else if self.model.finished() {
            Some(HaltReason::Finished)
        } else if self.run.budget().is_some_and(|budget| self.time > budget) {
            Some(HaltReason::BudgetExhausted)
        } else {
            None
        }
    }

    /// Advances the simulation by one half-cycle. A no-op once halted.
    ///
    /// # Errors
    ///
    /// Propagates a fatal out-of-bounds write, a console failure or a trace
    /// write failure.
    pub fn step(&mut self) -> Result<(), HarnessError> {
        if self.phase == Phase::Halted {
            return Ok(());
        }

        self.time += 1;
        self.clock = !self.clock;
        self.model.set_clock(self.clock);

        if self.run.heartbeat_interval != 0 && self.time % self.run.heartbeat_interval == 0 {
            info!("Simulation time: {}", self.time);
        }

        self.reset = reset_asserted(self.time);
        self.model.set_reset(self.reset);
        if self.phase == Phase::Resetting && self.time >= RESET_RELEASE_AT {
            debug!(time = self.time, "reset released");
            self.phase = Phase::Running;
        }

        let request = BusRequest::sample(&self.model);
        let read_data = self.bus.service(&mut self.memory, &request)?;
        self.model.set_read_data(read_data);

        let _ = self
            .console
            .observe(self.model.send(), self.clock, self.model.data_out())?;

        self.model.eval();

        if let Some(trace) = self.trace.as_mut() {
            let ports = PortSnapshot {
                clock: self.clock,
                reset: self.reset,
                request: BusRequest::sample(&self.model),
                read_data,
                send: self.model.send(),
                data_out: self.model.data_out(),
            };
            trace.sample(self.time, &ports, &self.model)?;
        }
        Ok(())
    }

    /// Runs to completion and reports the verdict.
    ///
    /// Calling `run` on a driver that has already halted returns the summary
    /// again without stepping. After a failed run that summary carries
    /// [`HaltReason::Failed`].
    ///
    /// # Errors
    ///
    /// Any error from [`Driver::step`], from shutdown, or from the cancel
    /// callback. The model is finalized and the trace closed in every case.
    pub fn run(&mut self) -> Result<RunSummary, HarnessError> {
        if let Some(reason) = self.halt {
            let verdict = self.verdict.evaluate(&self.memory);
            return Ok(self.summary(reason, verdict));
        }

        if self.run.budget().is_none() {
            warn!("Simulation will be executed infinitely!");
        }

        let looped = self.drive();
        let shutdown = self.shutdown();
        let reason = match looped.and_then(|reason| shutdown.map(|()| reason)) {
            Ok(reason) => reason,
            Err(e) => {
                self.halt = Some(HaltReason::Failed);
                return Err(e);
            }
        };
        self.halt = Some(reason);
        debug!(time = self.time, ?reason, "simulation halted");

        if reason == HaltReason::Cancelled {
            if let Some(hook) = self.cancel.as_mut() {
                hook.fire(&self.memory)?;
            }
        }

        let verdict = self.verdict.report(&self.memory);
        Ok(self.summary(reason, verdict))
    }

    /// Splits the driver into model, memory image and console.
    ///
    /// An open trace is closed.
    pub fn into_parts(self) -> (M, MemoryImage, ConsoleSink<W>) {
        (self.model, self.memory, self.console)
    }

    fn drive(&mut self) -> Result<HaltReason, HarnessError> {
        loop {
            if let Some(reason) = self.should_halt() {
                return Ok(reason);
            }
            self.step()?;
        }
    }

    /// Finalizes the model once, flushes the console and closes the trace.
    ///
    /// Every stage runs even if an earlier one failed; the first error wins.
    fn shutdown(&mut self) -> Result<(), HarnessError> {
        if !self.finalized {
            self.model.finalize();
            self.finalized = true;
        }
        self.phase = Phase::Halted;

        let flushed = self.console.flush();
        let closed = self.trace.as_mut().map_or(Ok(()), TraceGuard::close);
        flushed.and(closed)
    }

    fn summary(&self, reason: HaltReason, verdict: Verdict) -> RunSummary {
        RunSummary {
            time: self.time,
            reason,
            verdict,
            console_bytes: self.console.emitted(),
            refused_writes: self.bus.refused_writes(),
        }
    }
}
