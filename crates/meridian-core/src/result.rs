//! Result type aliases for Meridian.

use crate::MeridianError;

/// A specialized `Result` type for process-level Meridian operations.
pub type MeridianResult<T> = Result<T, MeridianError>;
