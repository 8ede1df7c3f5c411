//! Test infrastructure for the maintenance layer.
//!
//! Provides temp-file SQLite stores with the platform schema and fixtures to
//! populate them.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
