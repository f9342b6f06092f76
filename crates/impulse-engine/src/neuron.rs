// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neurons: the (action, potential, mode) units an engine schedules.

use crate::context::{Context, RuntimeStats};
use crate::potential::Potential;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Work performed when a neuron fires.
pub type Action = Arc<dyn Fn(Context) + Send + Sync>;

/// How a firing is executed relative to the beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Runs on the firing lane; the beat waits for it.
    Blocking,
    /// Dispatched to the carousel; never marked executing, so invocations may overlap.
    Stimulate,
    /// Dispatched to the carousel; marked executing until the task finishes.
    Loop,
}

pub struct Neuron {
    id: u64,
    mode: Mode,
    action: Action,
    potential: Box<dyn Potential>,
    muted: AtomicBool,
    executing: AtomicBool,
    last: Mutex<RuntimeStats>,
}

impl Neuron {
    pub(crate) fn new(
        id: u64,
        mode: Mode,
        action: Action,
        potential: Box<dyn Potential>,
        muted: bool,
        dormant: RuntimeStats,
    ) -> Self {
        Self {
            id,
            mode,
            action,
            potential,
            muted: AtomicBool::new(muted),
            executing: AtomicBool::new(false),
            last: Mutex::new(dormant),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::Release);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::Release);
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// Stats of the most recent completed activation
    pub fn last(&self) -> RuntimeStats {
        *self.last.lock()
    }

    pub(crate) fn set_executing(&self, executing: bool) {
        self.executing.store(executing, Ordering::Release);
    }

    pub(crate) fn record(&self, stats: RuntimeStats) {
        *self.last.lock() = stats;
    }

    pub(crate) fn action(&self) -> &Action {
        &self.action
    }

    pub(crate) fn is_due(&self, ctx: &Context) -> bool {
        self.potential.evaluate(ctx)
    }
}

impl fmt::Debug for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neuron")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("muted", &self.is_muted())
            .field("executing", &self.is_executing())
            .finish()
    }
}
