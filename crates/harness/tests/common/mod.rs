//! Shared fixtures for the harness tests.

pub mod harness;
