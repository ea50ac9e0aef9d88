//! Simulation control tests.


/// The half-cycle loop, reset sequencing and termination.
pub mod driver;




/// The compiled hardware model binding.
#[cfg(feature = "verilated")]
pub mod ffi;
