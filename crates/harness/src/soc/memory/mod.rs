//! Physical System Memory.
//!
//! This module implements the memory image the model runs against. It provides:
//! 1. **Buffer:** Zeroed word storage (`WordBuffer`) with bounds-checked access.
//! 2. **Image:** `MemoryImage`, which maps bus byte addresses onto word indices
//!    relative to a configurable bus base.
//! 3. **Persistence:** Region loading from file contents and raw dumps of the
//!    whole image.

/// Word storage backing the image.
pub mod buffer;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use self::buffer::WordBuffer;
use crate::common::HarnessError;
use crate::config::{MemoryConfig, Region};

/// Flat, word-addressed RAM owned by one simulation run.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    buffer: WordBuffer,
    bus_base: u32,
}

impl MemoryImage {
    /// Allocates a zero-filled image of `words` words mapped at `bus_base`.
    pub fn new(words: usize, bus_base: u32) -> Self {
        Self {
            buffer: WordBuffer::new(words),
            bus_base,
        }
    }

    /// Allocates the image described by `config`.
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.ram_words, config.bus_base)
    }

    /// Size of the image in words.
    pub fn len_words(&self) -> usize {
        self.buffer.len()
    }

    /// Bus address of word 0.
    pub fn bus_base(&self) -> u32 {
        self.bus_base
    }

    /// Word index addressed by bus byte address `addr`.
    ///
    /// Addresses below the bus base wrap to large indices and therefore fall
    /// outside the image.
    #[inline]
    pub fn index_of(&self, addr: u32) -> usize {
        (addr.wrapping_sub(self.bus_base) >> 2) as usize
    }

    /// Returns whether word `index` lies inside the image.
    #[inline]
    pub fn in_bounds(&self, index: usize) -> bool {
        index < self.buffer.len()
    }

    /// Word at `index`, or zero when out of bounds.
    #[inline]
    pub fn word(&self, index: usize) -> u32 {
        self.buffer.get(index).unwrap_or(0)
    }

    /// Mutable access to the word at `index`.
    #[inline]
    pub fn word_mut(&mut self, index: usize) -> Option<&mut u32> {
        self.buffer.get_mut(index)
    }

    /// The whole image as words.
    pub fn words(&self) -> &[u32] {
        self.buffer.as_slice()
    }

    /// Copies file contents into `region`, returning the number of bytes copied.
    pub fn load_region(&mut self, region: Region, bytes: &[u8]) -> usize {
        self.buffer
            .write_le_bytes(region.offset_words, bytes, region.max_words)
    }

    /// Writes the whole image, word for word, to `path`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Dump`] if the file cannot be created or written.
    pub fn dump(&self, path: &Path) -> Result<(), HarnessError> {
        let wrap = |source| HarnessError::Dump {
            path: path.to_path_buf(),
            source,
        };
        let mut out = BufWriter::new(File::create(path).map_err(wrap)?);
        self.buffer.write_le_to(&mut out).map_err(wrap)?;
        out.flush().map_err(wrap)
    }
}
