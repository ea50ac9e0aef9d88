//! Console Sink.
//!
//! Polled character output of the model. A byte is taken from `data_out`
//! whenever the model raises `send` while the clock input is high. The test is
//! made every half-cycle, so a `send` held across a whole high phase is seen on
//! each step of that phase. Output is buffered and flushed on newline, at
//! `TX_BUFFER_FLUSH_THRESHOLD`, and when the run halts.

use std::io::{self, Stdout, Write};

use crate::common::HarnessError;

/// Threshold for flushing the transmit buffer (4 KiB).
const TX_BUFFER_FLUSH_THRESHOLD: usize = 4096;

/// Forwards model output bytes to a host stream.
#[derive(Debug)]
pub struct ConsoleSink<W: Write> {
    out: W,
    tx_buffer: Vec<u8>,
    emitted: u64,
}

impl ConsoleSink<Stdout> {
    /// A sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Wraps `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            tx_buffer: Vec::with_capacity(TX_BUFFER_FLUSH_THRESHOLD),
            emitted: 0,
        }
    }

    /// Samples the UART signals for one step; returns whether a byte was taken.
    ///
    /// # Errors
    ///
    /// As [`ConsoleSink::emit`].
    pub fn observe(&mut self, send: bool, clock: bool, data: u8) -> Result<bool, HarnessError> {
        if send && clock {
            self.emit(data)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Queues one byte for output.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Console`] if a triggered flush fails.
    pub fn emit(&mut self, byte: u8) -> Result<(), HarnessError> {
        self.tx_buffer.push(byte);
        self.emitted += 1;
        if byte == b'\n' || self.tx_buffer.len() >= TX_BUFFER_FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes out anything buffered.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Console`] if the stream rejects the write.
    pub fn flush(&mut self) -> Result<(), HarnessError> {
        if !self.tx_buffer.is_empty() {
            self.out
                .write_all(&self.tx_buffer)
                .map_err(HarnessError::Console)?;
            self.tx_buffer.clear();
        }
        self.out.flush().map_err(HarnessError::Console)
    }

    /// Bytes taken from the model so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// The underlying stream. Buffered bytes are not included until flushed.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Flushes and returns the underlying stream.
    ///
    /// # Errors
    ///
    /// As [`ConsoleSink::flush`].
    pub fn into_inner(mut self) -> Result<W, HarnessError> {
        self.flush()?;
        Ok(self.out)
    }
}
