//! Word Buffer Implementation.
//!
//! Owned, zero-initialised backing storage for the memory image. Storage is a
//! boxed slice of 32-bit words; large images rely on the allocator handing out
//! zeroed pages lazily, so a 256 MiB image costs nothing until it is touched.
//! Every access is bounds-checked: reads past the end yield `None` and
//! writes past the end are refused.

use std::io::{self, Write};

use crate::common::WORD_BYTES;

/// Fixed-size array of 32-bit words.
#[derive(Clone, PartialEq, Eq)]
pub struct WordBuffer {
    words: Box<[u32]>,
}

impl WordBuffer {
    /// Allocates `len` zeroed words.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u32; len].into_boxed_slice(),
        }
    }

    /// Size of the buffer in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the buffer holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reads the word at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.words.get(index).copied()
    }

    /// Mutable access to the word at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut u32> {
        self.words.get_mut(index)
    }

    /// The whole buffer as a slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    /// Copies little-endian `bytes` into the buffer starting at word `offset`.
    ///
    /// At most `max_words` words are written and nothing is written past the
    /// end of the buffer. A trailing partial word is zero-padded. Returns the
    /// number of bytes copied.
    pub fn write_le_bytes(&mut self, offset: usize, bytes: &[u8], max_words: usize) -> usize {
        let room = self.len().saturating_sub(offset).min(max_words);
        let take = bytes.len().min(room * WORD_BYTES);

        let start = offset.min(self.words.len());
        for (slot, chunk) in self.words[start..]
            .iter_mut()
            .zip(bytes[..take].chunks(WORD_BYTES))
        {
            let mut lanes = [0u8; WORD_BYTES];
            lanes[..chunk.len()].copy_from_slice(chunk);
            *slot = u32::from_le_bytes(lanes);
        }
        take
    }

    /// Serializes the buffer word for word, little-endian.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn write_le_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for word in self.words.iter() {
            out.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for WordBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordBuffer")
            .field("len", &self.words.len())
            .finish_non_exhaustive()
    }
}
