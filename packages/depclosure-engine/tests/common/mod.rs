//! Common test utilities for depclosure-engine
//!
//! Snapshot builders and canned fixtures shared by the integration tests.

#![allow(dead_code)]

mod builders;
mod fixtures;

// Re-export all utilities
pub use builders::*;
pub use fixtures::*;
