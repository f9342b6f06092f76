// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Installs a console layer (text or JSON) filtered by the per-crate debug flags.
//! With the `file-logging` feature a daily-rolling combined log file is added.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingSettings};

/// Keeps background log writers alive; dropping it flushes them.
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging
///
/// # Errors
/// Fails if the filter string is malformed, the log directory cannot be created,
/// or a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, settings: &LoggingSettings) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string_with_base(&settings.level.to_lowercase());
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    #[allow(unused_mut)]
    let mut guard = LoggingGuard::default();

    let console_layer: BoxedLayer = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    if let Some(dir) = &settings.log_dir {
        let run_folder = dir.join(format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S")));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        let appender = tracing_appender::rolling::daily(&run_folder, "impulse.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
        guard._file_guards.push(file_guard);

        let file_filter = EnvFilter::try_new(&filter)
            .with_context(|| format!("Invalid log filter: {}", filter))?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(file_filter)
                .boxed(),
        );
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "[OBSERVABILITY] Logging initialised at {} (filter: {})",
        Utc::now().to_rfc3339(),
        filter
    );

    Ok(guard)
}

/// Initialize logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingSettings::default())
}
