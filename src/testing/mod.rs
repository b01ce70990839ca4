//! Testing utilities and mock implementations
//!
//! Mocks for the broker transport, the network link and the sensors, so the
//! cycle can be exercised on any host.

pub mod mocks;

pub use mocks::*;
