//! # Meridian Core
//!
//! Error definitions and the logging bootstrap shared by every Meridian crate.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::{init_telemetry, TelemetryConfig};
