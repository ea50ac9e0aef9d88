//! Waveform capture.
//!
//! A run records one sample per half-cycle when the `trace` feature is
//! compiled in and the run asks for it (`+trace`). The sink is opened before
//! the first step and held by a [`TraceGuard`], which closes it exactly once:
//! either explicitly when the run halts, or on drop if the run bails out early.
//!
//! Models may supply their own sink through [`SimModel::open_trace`]; otherwise
//! the harness records a VCD of the port signals plus whatever internal signals
//! the model exposes through [`SimModel::visit_signals`].

use std::fmt;
use std::io;

#[cfg(feature = "trace")]
use std::fs::{self, File};
#[cfg(feature = "trace")]
use std::io::{BufWriter, Write};
#[cfg(feature = "trace")]
use std::path::Path;

use tracing::warn;

use crate::common::HarnessError;
use crate::config::RunConfig;
use crate::sim::model::SimModel;
use crate::soc::BusRequest;

#[cfg(feature = "trace")]
use tracing::info;

#[cfg(feature = "trace")]
use crate::common::TRACE_DEPTH;
#[cfg(feature = "trace")]
use crate::sim::model::SignalSample;

/// Port values of one half-cycle, as seen by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortSnapshot {
    /// Clock input.
    pub clock: bool,
    /// Reset input.
    pub reset: bool,
    /// Bus signals driven by the model.
    pub request: BusRequest,
    /// Read data driven back into the model.
    pub read_data: u32,
    /// UART send flag.
    pub send: bool,
    /// UART output byte.
    pub data_out: u8,
}

/// A waveform recording; opened by its constructor.
pub trait WaveformSink {
    /// Records the state at simulated time `time`.
    fn sample(&mut self, time: u64, ports: &PortSnapshot, model: &dyn SimModel) -> io::Result<()>;
    /// Flushes and closes the recording.
    fn close(&mut self) -> io::Result<()>;
}

/// Owns an open sink and guarantees it is closed once.
pub struct TraceGuard {
    sink: Option<Box<dyn WaveformSink>>,
}

impl TraceGuard {
    /// Takes ownership of an open sink.
    pub fn new(sink: Box<dyn WaveformSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Whether the sink is still open.
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Records one sample; a no-op once closed.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Trace`] if the sink fails to write.
    pub fn sample(
        &mut self,
        time: u64,
        ports: &PortSnapshot,
        model: &dyn SimModel,
    ) -> Result<(), HarnessError> {
        match self.sink.as_mut() {
            Some(sink) => sink.sample(time, ports, model).map_err(HarnessError::Trace),
            None => Ok(()),
        }
    }

    /// Closes the sink. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Trace`] if the sink fails to flush.
    pub fn close(&mut self) -> Result<(), HarnessError> {
        match self.sink.take() {
            Some(mut sink) => sink.close().map_err(HarnessError::Trace),
            None => Ok(()),
        }
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{e}");
        }
    }
}

impl fmt::Debug for TraceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceGuard")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Opens the waveform sink requested by `run`, if any.
///
/// Creates the trace directory, then asks the model for a native sink before
/// falling back to [`VcdRecorder`]. Returns `Ok(None)` when tracing was not
/// requested or the capability is not compiled in.
///
/// # Errors
///
/// [`HarnessError::Trace`] if the directory or file cannot be created.
pub fn open_trace<M: SimModel + ?Sized>(
    model: &mut M,
    run: &RunConfig,
) -> Result<Option<TraceGuard>, HarnessError> {
    if !run.trace {
        return Ok(None);
    }

    #[cfg(feature = "trace")]
    {
        let path = run.trace_path();
        info!("Enabling waves into {}...", path.display());
        fs::create_dir_all(&run.trace_dir).map_err(HarnessError::Trace)?;
        let sink: Box<dyn WaveformSink> = match model.open_trace(&path, TRACE_DEPTH)? {
            Some(sink) => sink,
            None => Box::new(VcdRecorder::create(&path, TRACE_DEPTH)?),
        };
        Ok(Some(TraceGuard::new(sink)))
    }

    #[cfg(not(feature = "trace"))]
    {
        let _ = model;
        warn!("+trace ignored: waveform capture was not compiled in");
        Ok(None)
    }
}

/// Port signals every VCD carries, in declaration order.
#[cfg(feature = "trace")]
const PORTS: [(&str, u32); 9] = [
    ("clock", 1),
    ("reset", 1),
    ("rd_address", 32),
    ("rd_data", 32),
    ("wr_address", 32),
    ("wr_data", 32),
    ("wr_strobe", 4),
    ("send", 1),
    ("data_out", 8),
];

#[cfg(feature = "trace")]
#[derive(Debug)]
struct VcdVar {
    code: String,
    width: u32,
    last: Option<u64>,
}

/// Value Change Dump writer.
///
/// Variables are declared on the first sample (or on close, if nothing was
/// sampled). After that only changed values are written.
#[cfg(feature = "trace")]
#[derive(Debug)]
pub struct VcdRecorder<W: Write> {
    out: W,
    depth: u32,
    vars: Vec<VcdVar>,
    header_written: bool,
    closed: bool,
}

#[cfg(feature = "trace")]
impl VcdRecorder<BufWriter<File>> {
    /// Creates `path` and records into it.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Trace`] if the file cannot be created.
    pub fn create(path: &Path, depth: u32) -> Result<Self, HarnessError> {
        let file = File::create(path).map_err(HarnessError::Trace)?;
        Ok(Self::new(BufWriter::new(file), depth))
    }
}

#[cfg(feature = "trace")]
impl<W: Write> VcdRecorder<W> {
    /// Records into `out`, asking models for `depth` hierarchy levels.
    pub fn new(out: W, depth: u32) -> Self {
        Self {
            out,
            depth,
            vars: Vec::new(),
            header_written: false,
            closed: false,
        }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_header(&mut self, internals: &[(String, String, u32)]) -> io::Result<()> {
        writeln!(self.out, "$version tbsim {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out, "$timescale 1ns $end")?;
        writeln!(self.out, "$scope module top $end")?;
        for (name, width) in PORTS {
            self.declare(name, width)?;
        }

        let mut open_scope: Option<&str> = None;
        for (scope, name, width) in internals {
            if open_scope != Some(scope.as_str()) {
                if open_scope.is_some() {
                    writeln!(self.out, "$upscope $end")?;
                }
                writeln!(self.out, "$scope module {scope} $end")?;
                open_scope = Some(scope.as_str());
            }
            self.declare(name, *width)?;
        }
        if open_scope.is_some() {
            writeln!(self.out, "$upscope $end")?;
        }

        writeln!(self.out, "$upscope $end")?;
        writeln!(self.out, "$enddefinitions $end")?;
        self.header_written = true;
        Ok(())
    }

    fn declare(&mut self, name: &str, width: u32) -> io::Result<()> {
        let code = id_code(self.vars.len());
        writeln!(self.out, "$var wire {width} {code} {name} $end")?;
        self.vars.push(VcdVar {
            code,
            width,
            last: None,
        });
        Ok(())
    }
}

#[cfg(feature = "trace")]
impl<W: Write> WaveformSink for VcdRecorder<W> {
    fn sample(&mut self, time: u64, ports: &PortSnapshot, model: &dyn SimModel) -> io::Result<()> {
        let mut internals = Vec::new();
        model.visit_signals(self.depth, &mut |s: SignalSample<'_>| {
            internals.push((s.scope.to_owned(), s.name.to_owned(), s.width, s.value));
        });

        if !self.header_written {
            let decls: Vec<_> = internals
                .iter()
                .map(|(scope, name, width, _)| (scope.clone(), name.clone(), *width))
                .collect();
            self.write_header(&decls)?;
        }

        let request = &ports.request;
        let values = [
            u64::from(ports.clock),
            u64::from(ports.reset),
            u64::from(request.read_address),
            u64::from(ports.read_data),
            u64::from(request.write_address),
            u64::from(request.write_data),
            u64::from(request.write_strobe),
            u64::from(ports.send),
            u64::from(ports.data_out),
        ]
        .into_iter()
        .chain(internals.iter().map(|(_, _, _, value)| *value));

        let mut stamped = false;
        for (var, value) in self.vars.iter_mut().zip(values) {
            let value = value & width_mask(var.width);
            if var.last == Some(value) {
                continue;
            }
            if !stamped {
                writeln!(self.out, "#{time}")?;
                stamped = true;
            }
            if var.width == 1 {
                writeln!(self.out, "{value}{}", var.code)?;
            } else {
                writeln!(self.out, "b{value:b} {}", var.code)?;
            }
            var.last = Some(value);
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.header_written {
            self.write_header(&[])?;
        }
        self.closed = true;
        self.out.flush()
    }
}

/// Short printable identifier for the `index`th variable.
#[cfg(feature = "trace")]
fn id_code(mut index: usize) -> String {
    const FIRST: u8 = b'!';
    const RADIX: usize = (b'~' - b'!' + 1) as usize;
    let mut code = String::new();
    loop {
        code.push(char::from(FIRST + (index % RADIX) as u8));
        index /= RADIX;
        if index == 0 {
            break;
        }
        index -= 1;
    }
    code
}

#[cfg(feature = "trace")]
const fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
