//! Common types and constants used throughout the harness.
//!
//! This module provides building blocks shared by every component:
//! 1. **Constants:** The verdict sentinel, reset window and word geometry.
//! 2. **Error Handling:** The [`HarnessError`] type and its variants.

/// Fixed protocol constants.
pub mod constants;

/// Error type for loading, bus, sink and configuration failures.
pub mod error;

pub use constants::{EXPECTED_VERDICT, TRACE_DEPTH, WORD_BYTES, reset_asserted};
pub use error::HarnessError;
