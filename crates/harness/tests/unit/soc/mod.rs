//! SoC-side component tests.
