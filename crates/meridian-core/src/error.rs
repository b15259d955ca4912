//! Process-level error types.

use thiserror::Error;

/// Unified error type for process-level failures in Meridian.
///
/// Queue data-path failures never surface here; they are logged and turned
/// into `false`/`None` returns inside `meridian-queue`. This type covers the
/// things that stop a process from starting or running at all.
#[derive(Error, Debug)]
pub enum MeridianError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The key-value store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Telemetry could not be initialized.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MeridianError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 78,
            Self::StoreUnavailable(_) => 69,
            Self::Telemetry(_) | Self::Timeout(_) | Self::Internal(_) | Self::Other(_) => 1,
        }
    }

    /// Returns true if retrying the failed operation later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for MeridianError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MeridianError::Configuration("bad".into()).exit_code(), 78);
        assert_eq!(MeridianError::StoreUnavailable("down".into()).exit_code(), 69);
        assert_eq!(MeridianError::Internal("oops".into()).exit_code(), 1);
    }

    #[test]
    fn test_transient_errors() {
        assert!(MeridianError::StoreUnavailable("down".into()).is_transient());
        assert!(MeridianError::Timeout("ping".into()).is_transient());
        assert!(!MeridianError::Configuration("bad".into()).is_transient());
    }

    #[test]
    fn test_from_anyhow() {
        let err: MeridianError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.to_string(), "wrapped");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = MeridianError::from(parse_err);
        assert!(err.to_string().starts_with("Internal error: JSON error"));
    }
}
