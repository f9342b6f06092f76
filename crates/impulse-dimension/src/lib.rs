// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Impulse Dimension
//!
//! Windowed, timestamped histories of signals, produced and retired by neurons
//! on an [`impulse_engine::Engine`].
//!
//! ## Building blocks
//! - [`Dimension`]: a moment-ordered timeline with a trimmer neuron
//! - [`operators`]: observation, calculation, analysis, blend, multiplex,
//!   operator, bridge, dedicated loop and reaction constructors
//! - [`Recorder`]: push adapter for producers outside the beat loop
//! - [`Universe`] / [`World`]: named discovery index

pub mod data;
pub mod dimension;
pub mod error;
pub mod label;
pub mod operators;
pub mod recorder;
pub mod registry;

pub use data::Data;
pub use dimension::{Dimension, DimensionOptions};
pub use error::{DimensionError, DimensionResult, RegistryError, RegistryResult};
pub use label::{label, label_with};
pub use operators::*;
pub use recorder::Recorder;
pub use registry::{Collection, Dimensional, Universe, World};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
