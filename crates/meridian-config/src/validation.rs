//! Configuration validation module.
//!
//! Collects every invalid value in one pass so an operator sees the full
//! list at startup instead of fixing them one restart at a time.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A count that must be at least one is zero.
    ZeroCount { name: String },
    /// Timeout or interval value must be positive.
    NonPositiveInterval { name: String },
    /// Priority threshold outside the 1-5 priority range.
    InvalidPriorityThreshold { name: String, value: u8 },
    /// Graduated polling limits are out of order.
    InvalidPollLimits { fast: u32, medium: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::ZeroCount { name } => write!(f, "'{}' must be at least 1", name),
            Self::NonPositiveInterval { name } => {
                write!(f, "Interval '{}' must be positive", name)
            }
            Self::InvalidPriorityThreshold { name, value } => {
                write!(f, "Priority threshold '{}' is {} (must be 1-5)", name, value)
            }
            Self::InvalidPollLimits { fast, medium } => write!(
                f,
                "fast_poll_limit ({}) must not exceed medium_poll_limit ({})",
                fast, medium
            ),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidLogLevel { value } => write!(
                f,
                "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                value
            ),
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: json, pretty)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_redis(config, &mut errors);
        Self::validate_workers(config, &mut errors);
        Self::validate_queue(config, &mut errors);
        Self::validate_router(config, &mut errors);
        Self::validate_maintenance(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_redis(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let redis = &config.redis;

        match Url::parse(&redis.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(_) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if redis.pool_size == 0 {
            errors.push(zero("redis.pool_size"));
        }
        if redis.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: redis.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if redis.connect_timeout_secs == 0 {
            errors.push(non_positive("redis.connect_timeout_secs"));
        }
    }

    fn validate_workers(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let workers = &config.workers;

        if workers.count == 0 {
            errors.push(zero("workers.count"));
        }
        if workers.job_timeout_secs == 0 {
            errors.push(non_positive("workers.job_timeout_secs"));
        }
        if workers.shutdown_timeout_secs == 0 {
            errors.push(non_positive("workers.shutdown_timeout_secs"));
        }
        if workers.fast_poll_limit > workers.medium_poll_limit {
            errors.push(ConfigValidationError::InvalidPollLimits {
                fast: workers.fast_poll_limit,
                medium: workers.medium_poll_limit,
            });
        }
    }

    fn validate_queue(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let queue = &config.queue;

        if queue.max_queue_size == 0 {
            errors.push(zero("queue.max_queue_size"));
        }
        for (name, value) in [
            ("queue.high_priority_threshold", queue.high_priority_threshold),
            ("queue.router_priority_threshold", queue.router_priority_threshold),
        ] {
            if !(1..=5).contains(&value) {
                errors.push(ConfigValidationError::InvalidPriorityThreshold {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if queue.retry_backoff_base < 2 {
            errors.push(ConfigValidationError::ZeroCount {
                name: "queue.retry_backoff_base (minimum 2)".to_string(),
            });
        }
        if queue.max_retry_delay_secs == 0 {
            errors.push(non_positive("queue.max_retry_delay_secs"));
        }
    }

    fn validate_router(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.router.promotion_divisor == 0 {
            errors.push(zero("router.promotion_divisor"));
        }
    }

    fn validate_maintenance(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let maintenance = &config.maintenance;

        if maintenance.retry_interval_secs == 0 {
            errors.push(non_positive("maintenance.retry_interval_secs"));
        }
        if maintenance.rebalance_interval_secs == 0 {
            errors.push(non_positive("maintenance.rebalance_interval_secs"));
        }
        if maintenance.health_interval_secs == 0 {
            errors.push(non_positive("maintenance.health_interval_secs"));
        }
        if maintenance.assignment_max_age_minutes <= 0 {
            errors.push(non_positive("maintenance.assignment_max_age_minutes"));
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let observability = &config.observability;

        let level = observability.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: observability.log_level.clone(),
            });
        }

        let format = observability.log_format.to_lowercase();
        if format != "json" && format != "pretty" {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: observability.log_format.clone(),
            });
        }
    }
}

fn zero(name: &str) -> ConfigValidationError {
    ConfigValidationError::ZeroCount {
        name: name.to_string(),
    }
}

fn non_positive(name: &str) -> ConfigValidationError {
    ConfigValidationError::NonPositiveInterval {
        name: name.to_string(),
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
