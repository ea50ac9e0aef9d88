//! Memory-mapped I/O emulation around the model.
//!
//! This module groups the pieces the driver wires to the model's ports:
//! 1. **Memory:** The flat word-addressed image and its backing buffer.
//! 2. **Interconnect:** The bus responder servicing reads and strobed writes.
//! 3. **Console:** The polled character sink.

/// Polled UART output.
pub mod console;
/// Bus responder.
pub mod interconnect;
/// Memory image.
pub mod memory;

pub use console::ConsoleSink;
pub use interconnect::{BusRequest, BusResponder, WriteOutcome, merge_lanes};
pub use memory::MemoryImage;
