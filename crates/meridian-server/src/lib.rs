//! # Meridian Server Library
//!
//! Wiring for the worker process: the default job executor and the startup
//! helpers used by the binary.

pub mod executor;
pub mod startup;
