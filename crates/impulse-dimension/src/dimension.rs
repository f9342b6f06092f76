// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dimension
//!
//! A windowed, moment-ordered history of one signal.
//!
//! Every dimension owns a trimmer, a Loop-mode neuron that evicts entries older
//! than the window on every beat. Derived dimensions additionally own a
//! stimulator neuron that produces new samples (see [`crate::operators`]).
//!
//! ## Invariants
//! - `timeline` is ordered by moment ascending whenever a reader can observe it
//! - `current` holds the most recently timestamped sample ever produced
//! - `timeline`, `current` and the cache change together under one lock
//!
//! Neuron closures only hold a weak reference to the dimension. Dropping the last
//! handle deregisters both neurons from the engine.

use crate::data::Data;
use crate::label::label_with;
use crate::recorder::Recorder;
use impulse_config::DimensionConfig;
use impulse_engine::{always, Context, Engine, Lifecycle, Neuron, WeakEngine};
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Construction options shared by every dimension and operator.
#[derive(Debug, Clone)]
pub struct DimensionOptions {
    /// Defaults to a generated label such as `"analysis-42"`
    pub name: Option<String>,
    pub window: Duration,
    /// Register the stimulator muted
    pub muted: bool,
    /// Wake-up interval for bridge and dedicated consumer threads
    pub consumer_poll: Duration,
    /// Handoff queue depth for dedicated lanes
    pub queue_depth: usize,
}

impl DimensionOptions {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    pub fn from_config(config: &DimensionConfig) -> Self {
        Self {
            name: None,
            window: config.default_window(),
            muted: false,
            consumer_poll: config.consumer_poll(),
            queue_depth: config.dedicated_queue_depth.max(1),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn consumer_poll(mut self, poll: Duration) -> Self {
        self.consumer_poll = poll;
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }
}

impl Default for DimensionOptions {
    fn default() -> Self {
        Self::from_config(&DimensionConfig::default())
    }
}

pub(crate) struct DimensionState<V, C> {
    pub(crate) current: Option<Data<V>>,
    pub(crate) timeline: VecDeque<Data<V>>,
    pub(crate) cache: C,
}

pub(crate) struct DimensionInner<V, C> {
    id: u64,
    name: String,
    window: Duration,
    lifecycle: Lifecycle,
    engine: WeakEngine,
    state: Mutex<DimensionState<V, C>>,
    stimulator: OnceLock<Arc<Neuron>>,
    trimmer: OnceLock<Arc<Neuron>>,
    muted: AtomicBool,
}

impl<V: Clone, C> DimensionInner<V, C> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, DimensionState<V, C>> {
        self.state.lock()
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Append at the tail and unconditionally replace `current`.
    ///
    /// Only valid for producers whose samples complete in moment order.
    pub(crate) fn append(&self, data: Data<V>) {
        let mut state = self.state.lock();
        Self::append_locked(&mut *state, data);
    }

    pub(crate) fn append_locked(state: &mut DimensionState<V, C>, data: Data<V>) {
        state.current = Some(data.clone());
        state.timeline.push_back(data);
    }

    /// Splice `data` in moment order; `current` moves only to a strictly newer sample.
    pub(crate) fn insert(&self, data: Data<V>) {
        let mut state = self.state.lock();
        Self::insert_locked(&mut *state, data);
    }

    pub(crate) fn insert_locked(state: &mut DimensionState<V, C>, data: Data<V>) {
        let moment = data.moment();
        if state.current.as_ref().map_or(true, |c| moment > c.moment()) {
            state.current = Some(data.clone());
        }
        let at = state.timeline.partition_point(|d| d.moment() <= moment);
        state.timeline.insert(at, data);
    }

    /// Stamp `value` with the current instant, taken under the lock, and append it.
    pub(crate) fn stamp(&self, value: V, context: impl FnOnce(Instant) -> Context) -> Data<V> {
        let mut state = self.state.lock();
        let data = Data::new(context(Instant::now()), value);
        Self::append_locked(&mut *state, data.clone());
        data
    }

    pub(crate) fn trim(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let window = self.window;
        let stale = state
            .timeline
            .partition_point(|d| now.saturating_duration_since(d.moment()) >= window);
        state.timeline.drain(..stale);
        stale
    }
}

impl<V, C> Drop for DimensionInner<V, C> {
    fn drop(&mut self) {
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        for neuron in [self.stimulator.get(), self.trimmer.get()].into_iter().flatten() {
            let _ = engine.remove(neuron.id());
        }
        trace!("[DIMENSION] '{}' dropped, neurons deregistered", self.name);
    }
}

/// Cheaply clonable handle to a dimension.
pub struct Dimension<V, C = ()> {
    inner: Arc<DimensionInner<V, C>>,
}

impl<V, C> Clone for Dimension<V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Dimension<V>
where
    V: Clone + Send + 'static,
{
    /// A dimension with a trimmer but no stimulator, fed by a [`Recorder`].
    pub fn new(engine: &Engine, options: &DimensionOptions) -> Self {
        Self::build(engine, options, "dimension", ())
    }
}

impl<V, C> Dimension<V, C>
where
    V: Clone + Send + 'static,
    C: Send + 'static,
{
    pub fn with_cache(engine: &Engine, options: &DimensionOptions, cache: C) -> Self {
        Self::build(engine, options, "dimension", cache)
    }

    pub(crate) fn build(engine: &Engine, options: &DimensionOptions, prefix: &str, cache: C) -> Self {
        let lifecycle = engine.lifecycle().clone();
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| label_with(&lifecycle, prefix));

        let dimension = Self {
            inner: Arc::new(DimensionInner {
                id: lifecycle.next_id(),
                name,
                window: options.window,
                lifecycle,
                engine: engine.downgrade(),
                state: Mutex::new(DimensionState {
                    current: None,
                    timeline: VecDeque::new(),
                    cache,
                }),
                stimulator: OnceLock::new(),
                trimmer: OnceLock::new(),
                muted: AtomicBool::new(options.muted),
            }),
        };

        let weak = dimension.downgrade();
        let trimmer = engine.looping(
            move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.trim(Instant::now());
                }
            },
            always(),
            false,
        );
        let _ = dimension.inner.trimmer.set(trimmer);

        debug!(
            "[DIMENSION] Created '{}' (id {}, window {:?})",
            dimension.inner.name, dimension.inner.id, dimension.inner.window
        );
        dimension
    }

    pub(crate) fn downgrade(&self) -> Weak<DimensionInner<V, C>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &DimensionInner<V, C> {
        &self.inner
    }

    pub(crate) fn attach_stimulator(&self, neuron: Arc<Neuron>) {
        if self.inner.is_muted() {
            neuron.mute();
        }
        let _ = self.inner.stimulator.set(neuron);
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn len(&self) -> usize {
        self.inner.lock().timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently timestamped sample, if any has been produced
    pub fn current(&self) -> Option<Data<V>> {
        self.inner.lock().current.clone()
    }

    /// Owned snapshot of the timeline
    pub fn timeline(&self) -> Vec<Data<V>> {
        self.inner.lock().timeline.iter().cloned().collect()
    }

    /// Borrow the timeline for the duration of `f`, under the dimension's lock.
    ///
    /// `f` must not touch another dimension.
    pub fn with_timeline<R>(&self, f: impl FnOnce(&VecDeque<Data<V>>) -> R) -> R {
        f(&self.inner.lock().timeline)
    }

    /// Samples strictly newer than `moment`, oldest first
    pub fn since(&self, moment: Instant) -> Vec<Data<V>> {
        let state = self.inner.lock();
        let from = state.timeline.partition_point(|d| d.moment() <= moment);
        state.timeline.range(from..).cloned().collect()
    }

    /// Evict every sample at least one window older than `now`; returns the count removed.
    pub fn trim_at(&self, now: Instant) -> usize {
        self.inner.trim(now)
    }

    pub fn stimulator(&self) -> Option<Arc<Neuron>> {
        self.inner.stimulator.get().cloned()
    }

    pub fn trimmer(&self) -> Option<Arc<Neuron>> {
        self.inner.trimmer.get().cloned()
    }

    /// Stop sampling without discarding history.
    pub fn mute(&self) {
        self.inner.muted.store(true, Ordering::Release);
        if let Some(stimulator) = self.inner.stimulator.get() {
            stimulator.mute();
        }
    }

    pub fn unmute(&self) {
        self.inner.muted.store(false, Ordering::Release);
        if let Some(stimulator) = self.inner.stimulator.get() {
            stimulator.unmute();
        }
    }

    pub fn is_muted(&self) -> bool {
        self.inner.is_muted()
    }

    /// Push adapter appending directly to this dimension.
    pub fn recorder(&self) -> Recorder<V, C> {
        Recorder::new(self.clone())
    }
}

impl<V, C> fmt::Debug for Dimension<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("window", &self.inner.window)
            .field("muted", &self.inner.muted.load(Ordering::Relaxed))
            .finish()
    }
}
