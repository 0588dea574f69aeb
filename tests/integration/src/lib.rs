//! Integration test utilities for the gateway client
//!
//! Provides a scripted in-memory transport that stands in for the gateway,
//! plus fixtures for building payloads and configurations.

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::*;
