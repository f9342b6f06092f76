// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `impulse.toml`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ImpulseConfig {
    pub engine: EngineConfig,
    pub carousel: CarouselConfig,
    pub dimension: DimensionConfig,
    pub logging: LoggingConfig,
}

/// Beat loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceiling on the beat rate. Zero or negative values are normalised by the engine.
    pub max_frequency_hz: f64,
    /// Grace period after the loop exits so in-flight work can settle
    pub settle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frequency_hz: 1000.0,
            settle_ms: 50,
        }
    }
}

impl EngineConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Elastic worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Number of actions a worker executes before retiring
    pub worker_ttl: u64,
    /// How often an idle worker re-checks the lifecycle flag
    pub poll_interval_ms: u64,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            worker_ttl: 4096,
            poll_interval_ms: 50,
        }
    }
}

impl CarouselConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Dimension and consumer-lane configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DimensionConfig {
    pub default_window_ms: u64,
    /// Poll interval of bridge and dedicated-loop consumer threads
    pub consumer_poll_ms: u64,
    /// Capacity of the dedicated-loop handoff queue
    pub dedicated_queue_depth: usize,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            default_window_ms: 1000,
            consumer_poll_ms: 50,
            dedicated_queue_depth: 1,
        }
    }
}

impl DimensionConfig {
    pub fn default_window(&self) -> Duration {
        Duration::from_millis(self.default_window_ms)
    }

    pub fn consumer_poll(&self) -> Duration {
        Duration::from_millis(self.consumer_poll_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text or json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
