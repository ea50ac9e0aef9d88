//! Bus Responder.
//!
//! Services the model's memory port once per half-cycle. It provides:
//! 1. **Reads:** The word addressed by the read port, or zero outside the image.
//! 2. **Masked writes:** Four independent byte-lane merges driven by the strobe.
//! 3. **Bounds policy:** Writes outside the image are refused and reported
//!    according to [`OutOfBoundsPolicy`].

use tracing::{debug, warn};

use crate::common::HarnessError;
use crate::common::constants::STROBE_LANES;
use crate::config::OutOfBoundsPolicy;
use crate::sim::model::SimModel;
use crate::soc::memory::MemoryImage;

/// Strobe bits that select a byte lane; upper bits are ignored.
const STROBE_MASK: u8 = (1 << STROBE_LANES) - 1;

/// One step's worth of bus signals presented by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusRequest {
    /// Byte address of the read port.
    pub read_address: u32,
    /// Byte address of the write port.
    pub write_address: u32,
    /// Data on the write port.
    pub write_data: u32,
    /// Per-lane write enables; bit n enables bits `8n..8n+8`.
    pub write_strobe: u8,
}

impl BusRequest {
    /// Captures the request signals currently driven by `model`.
    pub fn sample<M: SimModel + ?Sized>(model: &M) -> Self {
        Self {
            read_address: model.read_address(),
            write_address: model.write_address(),
            write_data: model.write_data(),
            write_strobe: model.write_strobe(),
        }
    }
}

/// Merges `data` into `old`, lane by lane, where `strobe` enables the lane.
#[inline]
pub const fn merge_lanes(old: u32, data: u32, strobe: u8) -> u32 {
    let mut word = old;
    let mut lane = 0;
    while lane < STROBE_LANES {
        if strobe & (1 << lane) != 0 {
            let mask = 0xFFu32 << (lane * 8);
            word = (word & !mask) | (data & mask);
        }
        lane += 1;
    }
    word
}

/// Result of presenting a write to the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Strobe was zero; memory untouched.
    Idle,
    /// The selected lanes of word `index` were updated.
    Written {
        /// Word index that was modified.
        index: usize,
    },
    /// The address fell outside the image and the write was skipped.
    Refused {
        /// Word index the address decoded to.
        index: usize,
    },
}

/// Resolves bus reads and masked writes against a [`MemoryImage`].
#[derive(Debug, Clone, Default)]
pub struct BusResponder {
    policy: OutOfBoundsPolicy,
    refused_writes: u64,
}

impl BusResponder {
    /// Creates a responder with the given out-of-bounds policy.
    pub fn new(policy: OutOfBoundsPolicy) -> Self {
        Self {
            policy,
            refused_writes: 0,
        }
    }

    /// Out-of-bounds writes refused so far.
    pub fn refused_writes(&self) -> u64 {
        self.refused_writes
    }

    /// Reads the word at byte address `addr`; zero outside the image.
    #[inline]
    pub fn read(&self, image: &MemoryImage, addr: u32) -> u32 {
        image.word(image.index_of(addr))
    }

    /// Applies a masked write of `data` at byte address `addr`.
    ///
    /// # Errors
    ///
    /// [`HarnessError::OutOfBounds`] when the address is outside the image and
    /// the policy is [`OutOfBoundsPolicy::Fatal`].
    pub fn write(
        &mut self,
        image: &mut MemoryImage,
        addr: u32,
        data: u32,
        strobe: u8,
    ) -> Result<WriteOutcome, HarnessError> {
        let strobe = strobe & STROBE_MASK;
        if strobe == 0 {
            return Ok(WriteOutcome::Idle);
        }

        let index = image.index_of(addr);
        let words = image.len_words();
        let Some(word) = image.word_mut(index) else {
            return self.refuse(addr, index, words);
        };
        *word = merge_lanes(*word, data, strobe);
        Ok(WriteOutcome::Written { index })
    }

    /// Services a full request: read first, then the write.
    ///
    /// Returns the read data to drive back into the model. A write to the
    /// word being read is not visible until the next step.
    ///
    /// # Errors
    ///
    /// [`HarnessError::OutOfBounds`] for a refused write under
    /// [`OutOfBoundsPolicy::Fatal`].
    pub fn service(
        &mut self,
        image: &mut MemoryImage,
        request: &BusRequest,
    ) -> Result<u32, HarnessError> {
        let data = self.read(image, request.read_address);
        let _ = self.write(
            image,
            request.write_address,
            request.write_data,
            request.write_strobe,
        )?;
        Ok(data)
    }

    fn refuse(
        &mut self,
        address: u32,
        index: usize,
        words: usize,
    ) -> Result<WriteOutcome, HarnessError> {
        self.refused_writes += 1;
        match self.policy {
            OutOfBoundsPolicy::Fatal => Err(HarnessError::OutOfBounds {
                address,
                index,
                words,
            }),
            OutOfBoundsPolicy::Warn => {
                // First one is loud; a model stuck on a bad address would flood the log.
                if self.refused_writes == 1 {
                    warn!(
                        address = %format_args!("{address:#010x}"),
                        index,
                        words,
                        "write outside memory image ignored"
                    );
                } else {
                    debug!(
                        address = %format_args!("{address:#010x}"),
                        index,
                        "write outside memory image ignored"
                    );
                }
                Ok(WriteOutcome::Refused { index })
            }
        }
    }
}
