//! Binding to a compiled hardware model.
//!
//! `csrc/tbsim_model.cpp` wraps the Verilator-generated class in a C ABI and
//! is compiled against the verilated model by the build script. It exports one
//! constructor and destructor, a setter or getter per port, and the
//! simulator's native VCD tracer when the model was verilated with `--trace`.

use std::ffi::{CString, c_char, c_int};
use std::io;
use std::path::Path;
use std::ptr::NonNull;

use crate::common::HarnessError;
use crate::sim::model::SimModel;
use crate::sim::trace::{PortSnapshot, WaveformSink};

#[repr(C)]
struct RawModel {
    _private: [u8; 0],
}

#[repr(C)]
struct RawTrace {
    _private: [u8; 0],
}

unsafe extern "C" {
    fn tbsim_model_new() -> *mut RawModel;
    fn tbsim_model_delete(model: *mut RawModel);

    fn tbsim_model_set_clock(model: *mut RawModel, level: u8);
    fn tbsim_model_set_reset(model: *mut RawModel, level: u8);
    fn tbsim_model_set_rd_data(model: *mut RawModel, data: u32);

    fn tbsim_model_rd_address(model: *const RawModel) -> u32;
    fn tbsim_model_wr_address(model: *const RawModel) -> u32;
    fn tbsim_model_wr_data(model: *const RawModel) -> u32;
    fn tbsim_model_wr_strobe(model: *const RawModel) -> u8;
    fn tbsim_model_send(model: *const RawModel) -> u8;
    fn tbsim_model_data_out(model: *const RawModel) -> u8;

    fn tbsim_model_eval(model: *mut RawModel);
    fn tbsim_model_final(model: *mut RawModel);
    fn tbsim_model_got_finish() -> u8;

    fn tbsim_trace_supported() -> u8;
    fn tbsim_trace_open(model: *mut RawModel, path: *const c_char, depth: c_int) -> *mut RawTrace;
    fn tbsim_trace_dump(trace: *mut RawTrace, time: u64);
    fn tbsim_trace_close(trace: *mut RawTrace);
}

/// A hardware model compiled from RTL.
///
/// The underlying simulator keeps global state, so only one instance should
/// be alive at a time.
#[derive(Debug)]
pub struct VerilatedModel {
    raw: NonNull<RawModel>,
}

impl VerilatedModel {
    /// Instantiates the model.
    ///
    /// Returns `None` if the wrapper failed to allocate it.
    pub fn new() -> Option<Self> {
        // SAFETY: the constructor takes no arguments and returns either null
        // or a pointer owned by the caller until `tbsim_model_delete`.
        let raw = unsafe { tbsim_model_new() };
        NonNull::new(raw).map(|raw| Self { raw })
    }

    fn ptr(&self) -> *const RawModel {
        self.raw.as_ptr()
    }

    fn ptr_mut(&mut self) -> *mut RawModel {
        self.raw.as_ptr()
    }
}

impl Drop for VerilatedModel {
    fn drop(&mut self) {
        // SAFETY: `raw` came from `tbsim_model_new` and is deleted only here.
        unsafe { tbsim_model_delete(self.raw.as_ptr()) }
    }
}

impl SimModel for VerilatedModel {
    fn set_clock(&mut self, level: bool) {
        // SAFETY: `raw` is a live model for the lifetime of `self`.
        unsafe { tbsim_model_set_clock(self.ptr_mut(), u8::from(level)) }
    }

    fn set_reset(&mut self, level: bool) {
        // SAFETY: as above.
        unsafe { tbsim_model_set_reset(self.ptr_mut(), u8::from(level)) }
    }

    fn read_address(&self) -> u32 {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_rd_address(self.ptr()) }
    }

    fn set_read_data(&mut self, data: u32) {
        // SAFETY: `raw` is a live model for the lifetime of `self`.
        unsafe { tbsim_model_set_rd_data(self.ptr_mut(), data) }
    }

    fn write_address(&self) -> u32 {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_wr_address(self.ptr()) }
    }

    fn write_data(&self) -> u32 {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_wr_data(self.ptr()) }
    }

    fn write_strobe(&self) -> u8 {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_wr_strobe(self.ptr()) }
    }

    fn send(&self) -> bool {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_send(self.ptr()) != 0 }
    }

    fn data_out(&self) -> u8 {
        // SAFETY: getters only read port state.
        unsafe { tbsim_model_data_out(self.ptr()) }
    }

    fn eval(&mut self) {
        // SAFETY: `raw` is a live model for the lifetime of `self`.
        unsafe { tbsim_model_eval(self.ptr_mut()) }
    }

    fn finalize(&mut self) {
        // SAFETY: `raw` is a live model for the lifetime of `self`.
        unsafe { tbsim_model_final(self.ptr_mut()) }
    }

    fn finished(&self) -> bool {
        // SAFETY: reads the simulator's global `$finish` flag.
        unsafe { tbsim_model_got_finish() != 0 }
    }

    fn open_trace(
        &mut self,
        path: &Path,
        depth: u32,
    ) -> Result<Option<Box<dyn WaveformSink>>, HarnessError> {
        // SAFETY: reports a compile-time property of the wrapper.
        if unsafe { tbsim_trace_supported() } == 0 {
            return Ok(None);
        }
        let invalid = |msg: &str| HarnessError::Trace(io::Error::new(io::ErrorKind::InvalidInput, msg));
        let path = path
            .to_str()
            .ok_or_else(|| invalid("trace path is not valid UTF-8"))?;
        let path = CString::new(path).map_err(|_| invalid("trace path contains a NUL byte"))?;
        let depth = c_int::try_from(depth).unwrap_or(c_int::MAX);

        // SAFETY: `path` is NUL-terminated and outlives the call; the wrapper
        // enables tracing on the live model and returns null on failure.
        let raw = unsafe { tbsim_trace_open(self.ptr_mut(), path.as_ptr(), depth) };
        let raw = NonNull::new(raw).ok_or_else(|| {
            HarnessError::Trace(io::Error::other("model could not open the waveform file"))
        })?;
        Ok(Some(Box::new(NativeTrace { raw: Some(raw) })))
    }
}

/// The simulator's own VCD writer, attached to the model at open time.
#[derive(Debug)]
struct NativeTrace {
    raw: Option<NonNull<RawTrace>>,
}

impl WaveformSink for NativeTrace {
    fn sample(&mut self, time: u64, _ports: &PortSnapshot, _model: &dyn SimModel) -> io::Result<()> {
        if let Some(raw) = self.raw {
            // SAFETY: `raw` is open until `close` takes it.
            unsafe { tbsim_trace_dump(raw.as_ptr(), time) }
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(raw) = self.raw.take() {
            // SAFETY: taken out of `self`, so it is closed exactly once.
            unsafe { tbsim_trace_close(raw.as_ptr()) }
        }
        Ok(())
    }
}

impl Drop for NativeTrace {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
