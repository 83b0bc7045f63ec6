//! Mock platform implementation for testing
//!
//! This module provides a simulated counter that can be used for unit and
//! integration testing without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled

#![cfg(any(test, feature = "mock"))]

mod timer;

pub use timer::MockTimer;
