// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # impulse-observability
//!
//! Unified logging setup for the impulse crates with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: File-based log rotation (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known impulse crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "impulse",
    "impulse-config",
    "impulse-engine",
    "impulse-dimension",
    "impulse-observability",
];

/// Convert a crate name into the tracing target it logs under (`impulse-engine` -> `impulse_engine`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
