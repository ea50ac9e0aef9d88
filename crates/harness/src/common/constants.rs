//! Fixed protocol constants of the harness.
//!
//! Values here are part of the contract with the hardware model and the test
//! suites that run on it. Tunable layout values live in [`crate::config`].

/// Value the test program stores at the write-host address to signal success.
pub const EXPECTED_VERDICT: u32 = 1;

/// Reset is asserted while simulated time is strictly greater than this value...
pub const RESET_ASSERT_AFTER: u64 = 1;

/// ...and strictly less than this one (ticks 2 through 9).
pub const RESET_RELEASE_AT: u64 = 10;

/// Bytes per memory word.
pub const WORD_BYTES: usize = 4;

/// Width of the write-strobe mask (one bit per byte lane).
pub const STROBE_LANES: usize = 4;

/// Hierarchy levels recorded in a waveform trace.
pub const TRACE_DEPTH: u32 = 99;

/// Returns whether reset is held asserted at simulated time `time`.
#[inline]
pub const fn reset_asserted(time: u64) -> bool {
    time > RESET_ASSERT_AFTER && time < RESET_RELEASE_AT
}
