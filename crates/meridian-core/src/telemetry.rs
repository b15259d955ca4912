//! Logging bootstrap.
//!
//! Sets up a `tracing` subscriber with an env filter and either a pretty or a
//! JSON formatter. `RUST_LOG` always wins over the configured level.

use crate::{MeridianError, MeridianResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (json, pretty).
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Whether to install the Prometheus exporter.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Listen address for the Prometheus exporter.
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
}

fn default_service_name() -> String {
    "meridian".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9464".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: default_metrics_enabled(),
            metrics_addr: default_metrics_addr(),
        }
    }
}

impl TelemetryConfig {
    /// Returns the filter directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_directive(&self) -> String {
        format!("{level},meridian={level}", level = self.log_level.to_lowercase())
    }

    /// Returns true if logs should be emitted as JSON lines.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails if a global subscriber was already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> MeridianResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|e| MeridianError::Telemetry(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "meridian");
        assert_eq!(config.log_level, "info");
        assert!(!config.is_json());
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_default_directive() {
        let config = TelemetryConfig {
            log_level: "DEBUG".to_string(),
            ..TelemetryConfig::default()
        };
        assert_eq!(config.default_directive(), "debug,meridian=debug");
    }

    #[test]
    fn test_json_format_detection() {
        let config = TelemetryConfig {
            log_format: "JSON".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(config.is_json());
    }
}
