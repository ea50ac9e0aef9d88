//! Verdict Reporter.
//!
//! Bare-metal test programs signal their result by storing to a "write host"
//! word: `1` means pass, anything else is a failure. After the run the
//! harness reads that word back from the memory image. The address is given as
//! an absolute physical address and normalized against the RAM base.

use std::fmt;

use tracing::{info, warn};

use crate::common::EXPECTED_VERDICT;
use crate::soc::MemoryImage;

/// Outcome of the write-host check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No write-host address was configured.
    Unchecked,
    /// The word held the expected sentinel.
    Pass {
        /// Value read back.
        value: u32,
    },
    /// The word held something else.
    Mismatch {
        /// Sentinel that was expected.
        expected: u32,
        /// Value read back.
        got: u32,
    },
}

impl Verdict {
    /// Returns `true` for [`Verdict::Pass`].
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    /// Returns `true` for [`Verdict::Mismatch`].
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchecked => write!(f, "unchecked"),
            Self::Pass { value } => write!(f, "pass ({value})"),
            Self::Mismatch { expected, got } => write!(f, "Expected {expected}, but got {got}."),
        }
    }
}

/// Reads and classifies the write-host word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictReporter {
    write_host: Option<u64>,
    ram_base: u64,
}

impl VerdictReporter {
    /// Checks the absolute address `write_host`, if any, against RAM at `ram_base`.
    pub const fn new(write_host: Option<u64>, ram_base: u64) -> Self {
        Self {
            write_host,
            ram_base,
        }
    }

    /// Image word index of the write-host address.
    ///
    /// `None` when unconfigured or when the offset does not fit in `usize`.
    pub fn index(&self) -> Option<usize> {
        let offset = self.write_host?.wrapping_sub(self.ram_base);
        usize::try_from(offset >> 2).ok()
    }

    /// Classifies the current contents of `image`.
    ///
    /// An address outside the image reads as zero, like a bus read.
    pub fn evaluate(&self, image: &MemoryImage) -> Verdict {
        if self.write_host.is_none() {
            return Verdict::Unchecked;
        }
        let got = self.index().map_or(0, |index| image.word(index));
        if got == EXPECTED_VERDICT {
            Verdict::Pass { value: got }
        } else {
            Verdict::Mismatch {
                expected: EXPECTED_VERDICT,
                got,
            }
        }
    }

    /// Evaluates and logs the verdict.
    pub fn report(&self, image: &MemoryImage) -> Verdict {
        let verdict = self.evaluate(image);
        match verdict {
            Verdict::Mismatch { .. } => warn!("{verdict}"),
            Verdict::Pass { .. } => info!("write host check passed"),
            Verdict::Unchecked => {}
        }
        verdict
    }
}
