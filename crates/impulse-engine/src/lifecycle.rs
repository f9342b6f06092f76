// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide lifecycle state.
//!
//! Every polling loop (engine beats, carousel workers, bridge and dedicated
//! consumers) holds a [`Lifecycle`] handle and checks [`Lifecycle::is_alive`]
//! between units of work. Shutdown is cooperative: clearing the flag never
//! interrupts in-flight work, it only stops loops at their next check.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug)]
struct LifecycleState {
    alive: AtomicBool,
    inception: Instant,
    next_id: AtomicU64,
}

/// Cheaply clonable handle to shared lifecycle state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<LifecycleState>,
}

static GLOBAL: OnceLock<Lifecycle> = OnceLock::new();

impl Lifecycle {
    /// An isolated lifecycle, alive from construction.
    pub fn new() -> Self {
        Self {
            state: Arc::new(LifecycleState {
                alive: AtomicBool::new(true),
                inception: Instant::now(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The process-wide lifecycle, created on first use.
    pub fn global() -> &'static Lifecycle {
        GLOBAL.get_or_init(Lifecycle::new)
    }

    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.state.alive.store(alive, Ordering::Release);
    }

    pub fn inception(&self) -> Instant {
        self.state.inception
    }

    pub fn uptime(&self) -> Duration {
        self.state.inception.elapsed()
    }

    /// Globally unique (per lifecycle) identifier; never returns 0.
    pub fn next_id(&self) -> u64 {
        self.state.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn shutdown_now(&self) {
        info!("[LIFECYCLE] Shutdown requested");
        self.set_alive(false);
    }

    /// Clear the alive flag after `after` has elapsed.
    pub fn shutdown(&self, after: Duration) -> JoinHandle<()> {
        let lifecycle = self.clone();
        debug!("[LIFECYCLE] Shutdown scheduled in {:?}", after);
        thread::spawn(move || {
            thread::sleep(after);
            lifecycle.shutdown_now();
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

pub fn alive() -> bool {
    Lifecycle::global().is_alive()
}

pub fn set_alive(alive: bool) {
    Lifecycle::global().set_alive(alive)
}

pub fn inception() -> Instant {
    Lifecycle::global().inception()
}

pub fn next_id() -> u64 {
    Lifecycle::global().next_id()
}

pub fn shutdown(after: Duration) -> JoinHandle<()> {
    Lifecycle::global().shutdown(after)
}
