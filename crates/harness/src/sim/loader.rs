//! Image loading.
//!
//! Fills the memory image before the first step. It performs:
//! 1. **Program load:** The `+B` image is copied into the program region from
//!    word 0. A missing or unreadable program aborts the run.
//! 2. **Descriptor load:** The optional `+D` device-descriptor image is copied
//!    into the descriptor region. Failure here is logged and the run continues
//!    with a zeroed region.
//!
//! Files are read as raw bytes and packed into little-endian words. Anything
//! beyond a region's capacity is dropped; a trailing partial word is
//! zero-padded.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::common::{HarnessError, WORD_BYTES};
use crate::config::{MemoryConfig, Region};
use crate::soc::MemoryImage;

/// Bytes placed into each region by [`load_regions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Bytes copied into the program region.
    pub program_bytes: usize,
    /// Bytes copied into the descriptor region; `None` when none was loaded.
    pub descriptor_bytes: Option<usize>,
}

/// Reads `path` and copies it into `region` of `image`.
///
/// Returns the number of bytes copied, which is smaller than the file size
/// when the file overflows the region.
///
/// # Errors
///
/// [`HarnessError::Load`] if the file cannot be read.
pub fn load(image: &mut MemoryImage, path: &Path, region: Region) -> Result<usize, HarnessError> {
    let bytes = fs::read(path).map_err(|e| HarnessError::load(path, e))?;
    let copied = image.load_region(region, &bytes);
    if copied < bytes.len() {
        warn!(
            "{} is {} bytes; only the first {copied} fit in {} words",
            path.display(),
            bytes.len(),
            region.max_words
        );
    }
    Ok(copied)
}

/// Loads the program and, if given, the device descriptor.
///
/// # Errors
///
/// Only a program load failure is returned.
pub fn load_regions(
    image: &mut MemoryImage,
    layout: &MemoryConfig,
    program: &Path,
    descriptor: Option<&Path>,
) -> Result<LoadReport, HarnessError> {
    let program_bytes = load(image, program, layout.program_region())?;
    info!(
        "Loaded {} ({} words)",
        program.display(),
        program_bytes.div_ceil(WORD_BYTES)
    );

    let descriptor_bytes = match descriptor {
        None => {
            warn!("No device tree file specified!");
            None
        }
        Some(path) => match load(image, path, layout.descriptor_region()) {
            Ok(bytes) => {
                info!(
                    "Loaded {} at word {:#x}",
                    path.display(),
                    layout.descriptor_region().offset_words
                );
                Some(bytes)
            }
            Err(e) => {
                warn!("{e}; continuing without a device descriptor");
                None
            }
        },
    };

    Ok(LoadReport {
        program_bytes,
        descriptor_bytes,
    })
}
