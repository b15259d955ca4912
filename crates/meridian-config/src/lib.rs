//! # Meridian Config
//!
//! Configuration for the Meridian job queue.
//! Supports layered configuration from TOML files and environment variables,
//! validated up front so a bad value never reaches a running worker pool.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
