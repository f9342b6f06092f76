// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Impulse Engine
//!
//! Beat-driven scheduler for reactive actions.
//!
//! An [`Engine`] repeatedly evaluates a set of [`Neuron`]s, each an
//! (action, potential, mode) triple. The potential decides whether the action
//! runs on a given beat; the mode decides where it runs:
//! - **Blocking**: on the firing lane, the beat waits for it
//! - **Stimulate**: handed to the [`Carousel`], may overlap itself
//! - **Loop**: handed to the [`Carousel`], never overlaps itself
//!
//! ## Architecture
//! - Rayon fan-out per beat with an implicit barrier
//! - Elastic carousel of TTL-bounded worker threads for dispatched work
//! - Process-wide [`Lifecycle`] for shutdown and id allocation
//! - Faults in user actions are contained and logged, never propagated

pub mod carousel;
pub mod context;
pub mod engine;
pub mod error;
pub mod fault;
pub mod lifecycle;
pub mod neuron;
pub mod potential;

pub use carousel::Carousel;
pub use context::{Context, RuntimeStats};
pub use engine::{Engine, EngineStats, WeakEngine};
pub use error::{EngineError, EngineResult};
pub use lifecycle::Lifecycle;
pub use neuron::{Action, Mode, Neuron};
pub use potential::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
