// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Frequencies are deliberately not range-checked here: the engine normalises
//! zero or negative rates to the smallest positive rate so that potentials stay total.

use crate::{ConfigError, ConfigResult, ImpulseConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => write!(f, "{} must be greater than zero", field),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &ImpulseConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    if config.engine.max_frequency_hz.is_nan() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "engine.max_frequency_hz".to_string(),
            reason: "NaN is not a frequency".to_string(),
        });
    }

    for (field, value) in [
        ("carousel.worker_ttl", config.carousel.worker_ttl),
        ("carousel.poll_interval_ms", config.carousel.poll_interval_ms),
        ("dimension.default_window_ms", config.dimension.default_window_ms),
        ("dimension.consumer_poll_ms", config.dimension.consumer_poll_ms),
        (
            "dimension.dedicated_queue_depth",
            config.dimension.dedicated_queue_depth as u64,
        ),
    ] {
        if value == 0 {
            errors.push(ConfigValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
        });
    }
    if !LOG_FORMATS.contains(&config.logging.format.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("expected one of {}", LOG_FORMATS.join(", ")),
        });
    }

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}
