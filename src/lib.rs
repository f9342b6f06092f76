// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Impulse
//!
//! Beat-driven scheduling of reactive actions, plus windowed time-series
//! "dimensions" derived from them.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! impulse = "0.1"  # Default: engine + dimensions
//! ```
//!
//! ```rust,no_run
//! use impulse::prelude::*;
//! use std::time::Duration;
//!
//! let config = ImpulseConfig::default();
//! let engine = Engine::from_config(&config);
//!
//! let options = DimensionOptions::from_config(&config.dimension);
//! let ticks = calculate(&engine, &options, |ctx| ctx.beat, frequency(10.0));
//!
//! engine.start()?;
//! std::thread::sleep(Duration::from_millis(500));
//! engine.stop();
//! engine.join(Duration::from_secs(1));
//! println!("{} samples", ticks.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//! - **`dimension`** (default): timelines, derived operators, registry
//! - **`file-logging`**: daily-rolling log files via the observability crate
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  impulse-config / impulse-observability                 │
//! │  (TOML + env/CLI overrides, tracing initialisation)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  impulse-engine                                         │
//! │  (Lifecycle, potentials, neurons, beat loop, carousel)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  impulse-dimension                                      │
//! │  (Timelines, operators, recorder, Universe/World)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

use anyhow::Context as _;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub use impulse_config as config;
pub use impulse_engine as engine;
pub use impulse_observability as observability;

#[cfg(feature = "dimension")]
pub use impulse_dimension as dimension;

use impulse_config::{ImpulseConfig, LoggingConfig};
use impulse_observability::{CrateDebugFlags, LogFormat, LoggingGuard, LoggingSettings};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{DimensionConfig, EngineConfig, ImpulseConfig};
    pub use crate::engine::{
        always, beat_over, beat_under, even_beats, every_n_beats, frequency, never, odd_beats, on_beat,
        pace, resonant_frequency, Context, Engine, Lifecycle, Mode, Neuron, Potential, PotentialExt,
        RuntimeStats,
    };

    #[cfg(feature = "dimension")]
    pub use crate::dimension::{
        analyze, blend, bridge, calculate, dedicated, multiplex, observe, operate, react, ArithmeticOp, Data,
        Dimension, DimensionOptions, Discipline, Observable, Recorder, Signal, Tap, Universe,
    };
}

/// Translate the `[logging]` config section into observability settings.
pub fn logging_settings(config: &LoggingConfig) -> anyhow::Result<LoggingSettings> {
    let format: LogFormat = config
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    Ok(LoggingSettings {
        level: config.level.clone(),
        format,
        log_dir: None,
    })
}

/// Load configuration and install logging in one step.
///
/// `config_path` of `None` searches for `impulse.toml`; a missing file falls
/// back to defaults (environment overrides still apply).
pub fn bootstrap(
    config_path: Option<&Path>,
    cli_overrides: Option<&HashMap<String, String>>,
    debug_flags: &CrateDebugFlags,
) -> anyhow::Result<(ImpulseConfig, LoggingGuard)> {
    let config = match impulse_config::load_config(config_path, cli_overrides) {
        Ok(config) => config,
        Err(impulse_config::ConfigError::FileNotFound(_)) if config_path.is_none() => {
            let mut config = ImpulseConfig::default();
            impulse_config::apply_environment_overrides(&mut config);
            if let Some(cli) = cli_overrides {
                impulse_config::apply_cli_overrides(&mut config, cli);
            }
            config
        }
        Err(e) => return Err(e).context("Failed to load impulse configuration"),
    };
    impulse_config::validate_config(&config).context("Invalid impulse configuration")?;

    let guard = impulse_observability::init_logging(debug_flags, &logging_settings(&config.logging)?)?;
    info!(
        "[LIFECYCLE] impulse {} initialised ({:.1} Hz ceiling)",
        VERSION, config.engine.max_frequency_hz
    );
    Ok((config, guard))
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
