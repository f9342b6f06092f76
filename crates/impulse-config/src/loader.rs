// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, ImpulseConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "impulse.toml";

/// Find the impulse configuration file
///
/// Search order:
/// 1. `IMPULSE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./impulse.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("IMPULSE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by IMPULSE_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "configuration file '{}' not found in any of these locations:\n{}\n\nSet IMPULSE_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ImpulseConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ImpulseConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IMPULSE_MAX_FREQUENCY_HZ` -> `engine.max_frequency_hz`
/// - `IMPULSE_SETTLE_MS` -> `engine.settle_ms`
/// - `IMPULSE_WORKER_TTL` -> `carousel.worker_ttl`
/// - `IMPULSE_DEFAULT_WINDOW_MS` -> `dimension.default_window_ms`
/// - `IMPULSE_LOG_LEVEL` -> `logging.level`
/// - `IMPULSE_LOG_FORMAT` -> `logging.format`
pub fn apply_environment_overrides(config: &mut ImpulseConfig) {
    let vars: HashMap<String, String> = [
        ("max_frequency_hz", "IMPULSE_MAX_FREQUENCY_HZ"),
        ("settle_ms", "IMPULSE_SETTLE_MS"),
        ("worker_ttl", "IMPULSE_WORKER_TTL"),
        ("default_window_ms", "IMPULSE_DEFAULT_WINDOW_MS"),
        ("log_level", "IMPULSE_LOG_LEVEL"),
        ("log_format", "IMPULSE_LOG_FORMAT"),
    ]
    .into_iter()
    .filter_map(|(key, var)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"max_frequency_hz": "60", "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut ImpulseConfig, cli_args: &HashMap<String, String>) {
    apply_overrides(config, cli_args);
}

// Unparseable numeric values are ignored and the previous value is kept.
fn apply_overrides(config: &mut ImpulseConfig, values: &HashMap<String, String>) {
    if let Some(value) = values.get("max_frequency_hz") {
        if let Ok(hz) = value.parse::<f64>() {
            config.engine.max_frequency_hz = hz;
        }
    }
    if let Some(value) = values.get("settle_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.engine.settle_ms = ms;
        }
    }
    if let Some(value) = values.get("worker_ttl") {
        if let Ok(ttl) = value.parse::<u64>() {
            config.carousel.worker_ttl = ttl;
        }
    }
    if let Some(value) = values.get("default_window_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.dimension.default_window_ms = ms;
        }
    }
    if let Some(value) = values.get("log_level") {
        config.logging.level = value.to_lowercase();
    }
    if let Some(value) = values.get("log_format") {
        config.logging.format = value.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_impulse.toml");
        File::create(&config_path).unwrap();

        env::set_var("IMPULSE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("IMPULSE_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nope.toml");

        env::set_var("IMPULSE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("IMPULSE_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("IMPULSE_MAX_FREQUENCY_HZ");
        env::remove_var("IMPULSE_WORKER_TTL");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("impulse.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[engine]").unwrap();
        writeln!(file, "max_frequency_hz = 120.0").unwrap();
        writeln!(file, "[carousel]").unwrap();
        writeln!(file, "worker_ttl = 16").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.engine.max_frequency_hz, 120.0);
        assert_eq!(config.carousel.worker_ttl, 16);
        assert_eq!(config.dimension.default_window_ms, 1000);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("impulse.toml");
        std::fs::write(&config_path, "[engine\nmax_frequency_hz = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ImpulseConfig::default();

        env::set_var("IMPULSE_MAX_FREQUENCY_HZ", "250");
        env::set_var("IMPULSE_LOG_LEVEL", "DEBUG");
        env::set_var("IMPULSE_WORKER_TTL", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("IMPULSE_MAX_FREQUENCY_HZ");
        env::remove_var("IMPULSE_LOG_LEVEL");
        env::remove_var("IMPULSE_WORKER_TTL");

        assert_eq!(config.engine.max_frequency_hz, 250.0);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.carousel.worker_ttl, 4096);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("impulse.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[engine]").unwrap();
        writeln!(file, "max_frequency_hz = 10.0").unwrap();
        writeln!(file, "settle_ms = 5").unwrap();

        env::set_var("IMPULSE_MAX_FREQUENCY_HZ", "20");
        env::set_var("IMPULSE_SETTLE_MS", "7");

        let mut cli_args = HashMap::new();
        cli_args.insert("max_frequency_hz".to_string(), "30".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("IMPULSE_MAX_FREQUENCY_HZ");
        env::remove_var("IMPULSE_SETTLE_MS");

        // CLI wins for frequency, env wins for settle (no CLI override)
        assert_eq!(config.engine.max_frequency_hz, 30.0);
        assert_eq!(config.engine.settle_ms, 7);
    }
}
