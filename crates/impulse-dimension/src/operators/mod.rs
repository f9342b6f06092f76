// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Derived-dimension operators
//!
//! Each constructor builds a new [`Dimension`](crate::Dimension) with its trimmer,
//! then wires a stimulator neuron (or, for bridges, a consumer thread) that
//! produces samples from external cells, functions or other dimensions.
//!
//! Operators read a source dimension by snapshotting it under the source's lock
//! and releasing it before computing. No operator holds two dimension locks at once.

pub mod analysis;
pub mod blend;
pub mod bridge;
pub mod calculation;
pub mod dedicated;
pub mod multiplex;
pub mod observation;
pub mod operator;
pub mod reaction;

pub use analysis::{analyze, Analysis, Discipline};
pub use blend::{blend, Blended};
pub use bridge::bridge;
pub use calculation::calculate;
pub use dedicated::dedicated;
pub use multiplex::{multiplex, Signal, Tap};
pub use observation::{observe, Observable};
pub use operator::{operate, Arithmetic, ArithmeticOp, Operation};
pub use reaction::react;

#[cfg(test)]
pub(crate) mod testing {
    use impulse_config::{CarouselConfig, EngineConfig};
    use impulse_engine::{Engine, Lifecycle};
    use std::thread;
    use std::time::{Duration, Instant};

    pub fn engine_at(hz: f64) -> Engine {
        let engine = EngineConfig {
            max_frequency_hz: hz,
            settle_ms: 5,
        };
        let carousel = CarouselConfig {
            worker_ttl: 4096,
            poll_interval_ms: 5,
        };
        Engine::with_lifecycle(Lifecycle::new(), &engine, &carousel)
    }

    pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }
}
