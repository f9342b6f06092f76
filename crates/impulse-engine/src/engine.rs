// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Impulse Engine
//!
//! Owns a population of neurons and drives the beat loop.
//!
//! ## Beat cycle
//! 1. Busy-poll until at least `1 / max_frequency` has passed since the previous beat
//! 2. Snapshot the neuron set; if nothing is executing, the beat counter resets to 0
//! 3. Build the beat's [`Context`] and evaluate the optional stop potential
//! 4. Fire every non-executing, non-muted neuron in parallel and wait for all of them
//!
//! Beats never overlap. Stimulate and Loop neurons only block the beat for the
//! duration of their hand-off to the [`Carousel`].

use crate::carousel::Carousel;
use crate::context::{Context, RuntimeStats};
use crate::error::{EngineError, EngineResult};
use crate::fault::contain;
use crate::lifecycle::Lifecycle;
use crate::neuron::{Action, Mode, Neuron};
use crate::potential::{period_of, Potential};
use impulse_config::{CarouselConfig, EngineConfig, ImpulseConfig};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Engine performance counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub total_beats: u64,
    pub total_firings: u64,
    pub contained_faults: u64,
}

impl EngineStats {
    pub fn avg_firings_per_beat(&self) -> f64 {
        if self.total_beats == 0 {
            0.0
        } else {
            self.total_firings as f64 / self.total_beats as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    beats: AtomicU64,
    firings: AtomicU64,
    faults: AtomicU64,
}

struct EngineInner {
    id: u64,
    lifecycle: Lifecycle,
    carousel: Carousel,
    max_frequency_bits: AtomicU64,
    settle: Duration,
    neurons: RwLock<Vec<Arc<Neuron>>>,
    active: AtomicBool,
    beat: AtomicU64,
    last_cycle: Mutex<RuntimeStats>,
    stop_potential: RwLock<Option<Box<dyn Potential>>>,
    on_stop: RwLock<Option<StopCallback>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

/// Cheaply clonable handle to one engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Non-owning handle, for holders that must not keep the engine alive.
#[derive(Clone)]
pub struct WeakEngine {
    inner: Weak<EngineInner>,
}

impl WeakEngine {
    pub fn upgrade(&self) -> Option<Engine> {
        self.inner.upgrade().map(|inner| Engine { inner })
    }
}

impl Engine {
    /// Create an engine bound to the process-wide lifecycle
    pub fn new(engine: &EngineConfig, carousel: &CarouselConfig) -> Self {
        Self::with_lifecycle(Lifecycle::global().clone(), engine, carousel)
    }

    pub fn from_config(config: &ImpulseConfig) -> Self {
        Self::new(&config.engine, &config.carousel)
    }

    pub fn with_lifecycle(lifecycle: Lifecycle, engine: &EngineConfig, carousel: &CarouselConfig) -> Self {
        let id = lifecycle.next_id();
        let now = Instant::now();
        Self {
            inner: Arc::new(EngineInner {
                id,
                carousel: Carousel::new(lifecycle.clone(), carousel),
                lifecycle,
                max_frequency_bits: AtomicU64::new(engine.max_frequency_hz.to_bits()),
                settle: engine.settle(),
                neurons: RwLock::new(Vec::new()),
                active: AtomicBool::new(false),
                beat: AtomicU64::new(0),
                last_cycle: Mutex::new(RuntimeStats::dormant(now)),
                stop_potential: RwLock::new(None),
                on_stop: RwLock::new(None),
                thread_handle: Mutex::new(None),
                counters: Arc::new(Counters::default()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }

    pub fn carousel(&self) -> &Carousel {
        &self.inner.carousel
    }

    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    pub fn block<A, P>(&self, action: A, potential: P, muted: bool) -> Arc<Neuron>
    where
        A: Fn(Context) + Send + Sync + 'static,
        P: Potential + 'static,
    {
        self.register(Mode::Blocking, Arc::new(action), Box::new(potential), muted)
    }

    pub fn stimulate<A, P>(&self, action: A, potential: P, muted: bool) -> Arc<Neuron>
    where
        A: Fn(Context) + Send + Sync + 'static,
        P: Potential + 'static,
    {
        self.register(Mode::Stimulate, Arc::new(action), Box::new(potential), muted)
    }

    pub fn looping<A, P>(&self, action: A, potential: P, muted: bool) -> Arc<Neuron>
    where
        A: Fn(Context) + Send + Sync + 'static,
        P: Potential + 'static,
    {
        self.register(Mode::Loop, Arc::new(action), Box::new(potential), muted)
    }

    /// Fire once, immediately, against a freshly built context, then deregister.
    ///
    /// The potential still gates the firing. With `dispatch` the action runs on the
    /// carousel (Loop semantics), otherwise on the calling thread.
    pub fn trigger<A, P>(&self, action: A, potential: P, dispatch: bool) -> Arc<Neuron>
    where
        A: Fn(Context) + Send + Sync + 'static,
        P: Potential + 'static,
    {
        let mode = if dispatch { Mode::Loop } else { Mode::Blocking };
        // Registered muted so a concurrent beat never fires it a second time.
        let neuron = self.register(mode, Arc::new(action), Box::new(potential), true);

        let now = Instant::now();
        let last_cycle = *self.inner.last_cycle.lock();
        let ctx = Context::new(
            self.inner.lifecycle.next_id(),
            self.beat(),
            now,
            now.saturating_duration_since(last_cycle.start),
            last_cycle,
        );

        self.fire(&neuron, ctx);
        let _ = self.remove(neuron.id());
        neuron
    }

    fn register(&self, mode: Mode, action: Action, potential: Box<dyn Potential>, muted: bool) -> Arc<Neuron> {
        let id = self.inner.lifecycle.next_id();
        let neuron = Arc::new(Neuron::new(
            id,
            mode,
            action,
            potential,
            muted,
            RuntimeStats::dormant(Instant::now()),
        ));
        self.inner.neurons.write().push(Arc::clone(&neuron));
        trace!("[ENGINE] Engine {} registered {:?} neuron {}", self.inner.id, mode, id);
        neuron
    }

    pub fn remove(&self, id: u64) -> EngineResult<Arc<Neuron>> {
        let mut neurons = self.inner.neurons.write();
        let index = neurons
            .iter()
            .position(|n| n.id() == id)
            .ok_or(EngineError::NeuronNotFound(id))?;
        Ok(neurons.remove(index))
    }

    pub fn get(&self, id: u64) -> Option<Arc<Neuron>> {
        self.inner.neurons.read().iter().find(|n| n.id() == id).cloned()
    }

    /// Snapshot of the registered neurons
    pub fn range(&self) -> Vec<Arc<Neuron>> {
        self.inner.neurons.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.neurons.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mute_by_id(&self, id: u64) -> EngineResult<()> {
        let neurons = self.inner.neurons.read();
        let neuron = neurons
            .iter()
            .find(|n| n.id() == id)
            .ok_or(EngineError::NeuronNotFound(id))?;
        neuron.mute();
        Ok(())
    }

    pub fn unmute_by_id(&self, id: u64) -> EngineResult<()> {
        let neurons = self.inner.neurons.read();
        let neuron = neurons
            .iter()
            .find(|n| n.id() == id)
            .ok_or(EngineError::NeuronNotFound(id))?;
        neuron.unmute();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lifecycle controls
    // ---------------------------------------------------------------------

    /// Stop once `potential` holds for a beat's context (checked before firing).
    pub fn stop_when<P: Potential + 'static>(&self, potential: P) {
        *self.inner.stop_potential.write() = Some(Box::new(potential));
    }

    /// Callback run synchronously whenever the engine transitions to inactive via `stop`.
    pub fn on_stop<F: Fn() + Send + Sync + 'static>(&self, callback: F) {
        *self.inner.on_stop.write() = Some(Arc::new(callback));
    }

    pub fn stop(&self) {
        if self.inner.active.swap(false, Ordering::AcqRel) {
            info!("[ENGINE] Engine {} stopping at beat {}", self.inner.id, self.beat());
            let callback = self.inner.on_stop.read().clone();
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Beat number of the most recent cycle
    pub fn beat(&self) -> u64 {
        self.inner.beat.load(Ordering::Relaxed)
    }

    /// Set the beat-rate ceiling (can be called while running)
    pub fn set_max_frequency(&self, hz: f64) {
        self.inner.max_frequency_bits.store(hz.to_bits(), Ordering::Relaxed);
        info!("[ENGINE] Engine {} ceiling set to {:.2} Hz", self.inner.id, hz);
    }

    pub fn max_frequency(&self) -> f64 {
        f64::from_bits(self.inner.max_frequency_bits.load(Ordering::Relaxed))
    }

    pub fn stats(&self) -> EngineStats {
        let counters = &self.inner.counters;
        EngineStats {
            total_beats: counters.beats.load(Ordering::Relaxed),
            total_firings: counters.firings.load(Ordering::Relaxed),
            contained_faults: counters.faults.load(Ordering::Relaxed),
        }
    }

    /// Run the beat loop on the calling thread until stopped.
    pub fn spark(&self) {
        if self.inner.active.swap(true, Ordering::AcqRel) {
            warn!("[ENGINE] Engine {} is already active", self.inner.id);
            return;
        }
        self.run();
    }

    /// Run the beat loop on a dedicated thread.
    pub fn start(&self) -> EngineResult<()> {
        if self.inner.active.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyActive(self.inner.id));
        }

        let name = format!("impulse-engine-{}", self.inner.id);
        let engine = self.clone();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || engine.run());

        match spawned {
            Ok(handle) => {
                *self.inner.thread_handle.lock() = Some(handle);
                Ok(())
            }
            Err(source) => {
                self.inner.active.store(false, Ordering::Release);
                Err(EngineError::ThreadSpawn { name, source })
            }
        }
    }

    /// Wait up to `timeout` for a thread started with [`Engine::start`] to exit.
    ///
    /// Returns `true` if the thread finished (or none was running).
    pub fn join(&self, timeout: Duration) -> bool {
        let Some(handle) = self.inner.thread_handle.lock().take() else {
            return true;
        };

        // JoinHandle has no timed join; wait on a helper thread instead.
        let (tx, rx) = crossbeam::channel::bounded(1);
        thread::spawn(move || {
            let _ = tx.send(handle.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                warn!("[ENGINE] Engine {} thread panicked", self.inner.id);
                true
            }
            Err(_) => {
                warn!(
                    "[ENGINE] Engine {} did not stop within {:?}",
                    self.inner.id, timeout
                );
                false
            }
        }
    }

    fn run(&self) {
        info!(
            "[ENGINE] Engine {} sparked ({:.2} Hz ceiling, {} neurons)",
            self.inner.id,
            self.max_frequency(),
            self.len()
        );

        self.beat_loop();
        self.inner.active.store(false, Ordering::Release);

        // Let in-flight carousel work settle before returning.
        thread::sleep(self.inner.settle);
        info!(
            "[ENGINE] Engine {} stopped after {} beats",
            self.inner.id,
            self.stats().total_beats
        );
    }

    fn beat_loop(&self) {
        let inner = &self.inner;
        let mut beat: u64 = 0;
        let mut last_beat_start = Instant::now();
        let mut last_beat_finish = last_beat_start;
        let mut last_refractory = Duration::ZERO;

        while inner.lifecycle.is_alive() && inner.active.load(Ordering::Acquire) {
            let now = Instant::now();
            let period = now.saturating_duration_since(last_beat_start);
            if period < period_of(self.max_frequency()) {
                std::hint::spin_loop();
                continue;
            }

            let snapshot = inner.neurons.read().clone();
            if !snapshot.iter().any(|n| n.is_executing()) {
                beat = 0;
            }

            let last_cycle = RuntimeStats {
                inception: last_beat_start,
                start: last_beat_start,
                end: last_beat_finish,
                refractory_period: last_refractory,
            };
            *inner.last_cycle.lock() = last_cycle;
            inner.beat.store(beat, Ordering::Relaxed);

            let ctx = Context::new(inner.lifecycle.next_id(), beat, now, period, last_cycle);

            let should_stop = inner
                .stop_potential
                .read()
                .as_ref()
                .is_some_and(|p| p.evaluate(&ctx));
            if should_stop {
                debug!("[ENGINE] Engine {} stop potential held at beat {}", inner.id, beat);
                self.stop();
                break;
            }

            let due: Vec<&Arc<Neuron>> = snapshot
                .iter()
                .filter(|n| !n.is_executing() && !n.is_muted())
                .collect();
            let fired = due.par_iter().filter(|n| self.fire(n, ctx)).count();

            inner.counters.beats.fetch_add(1, Ordering::Relaxed);
            inner.counters.firings.fetch_add(fired as u64, Ordering::Relaxed);
            if beat % 1000 == 0 && beat > 0 {
                trace!("[ENGINE] Engine {} beat {} (alive)", inner.id, beat);
            }

            last_refractory = now.saturating_duration_since(last_beat_finish);
            last_beat_start = now;
            last_beat_finish = Instant::now();
            beat += 1;
        }
    }

    /// Evaluate the neuron's potential and run its action per its mode.
    ///
    /// A skipped firing leaves the neuron's stats untouched. Returns whether it fired.
    fn fire(&self, neuron: &Arc<Neuron>, ctx: Context) -> bool {
        let last = neuron.last();
        let ctx = ctx.with_last_activation(last);
        if !neuron.is_due(&ctx) {
            return false;
        }

        let start = Instant::now();
        let refractory_period = start.saturating_duration_since(last.end);

        match neuron.mode() {
            Mode::Blocking => {
                let activation = Activation::begin(neuron, ctx.moment, start, refractory_period);
                let action = neuron.action();
                if !contain("ENGINE", neuron.id(), || action(ctx)) {
                    self.inner.counters.faults.fetch_add(1, Ordering::Relaxed);
                }
                drop(activation);
            }
            Mode::Stimulate => {
                let action = Arc::clone(neuron.action());
                let counters = Arc::clone(&self.inner.counters);
                let id = neuron.id();
                self.inner.carousel.step(move || {
                    if !contain("ENGINE", id, || action(ctx)) {
                        counters.faults.fetch_add(1, Ordering::Relaxed);
                    }
                });
                neuron.record(RuntimeStats {
                    inception: ctx.moment,
                    start,
                    end: Instant::now(),
                    refractory_period,
                });
            }
            Mode::Loop => {
                let activation = Activation::begin(neuron, ctx.moment, start, refractory_period);
                let counters = Arc::clone(&self.inner.counters);
                let accepted = self.inner.carousel.step(move || {
                    let action = Arc::clone(activation.neuron.action());
                    if !contain("ENGINE", activation.neuron.id(), || action(ctx)) {
                        counters.faults.fetch_add(1, Ordering::Relaxed);
                    }
                    drop(activation);
                });
                if !accepted {
                    debug!("[ENGINE] Neuron {} dispatch refused, released unrun", neuron.id());
                }
            }
        }
        true
    }
}

/// One in-flight activation of a Blocking or Loop neuron.
///
/// Marks the neuron executing on creation. Dropping it records the activation's
/// stats and clears the flag, whether the action ran or the job was discarded.
struct Activation {
    neuron: Arc<Neuron>,
    inception: Instant,
    start: Instant,
    refractory_period: Duration,
}

impl Activation {
    fn begin(neuron: &Arc<Neuron>, inception: Instant, start: Instant, refractory_period: Duration) -> Self {
        neuron.set_executing(true);
        Self {
            neuron: Arc::clone(neuron),
            inception,
            start,
            refractory_period,
        }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.neuron.record(RuntimeStats {
            inception: self.inception,
            start: self.start,
            end: Instant::now(),
            refractory_period: self.refractory_period,
        });
        self.neuron.set_executing(false);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .field("beat", &self.beat())
            .field("neurons", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::{always, beat_over, never};
    use std::sync::atomic::AtomicUsize;

    fn test_engine(hz: f64) -> Engine {
        let engine_config = EngineConfig {
            max_frequency_hz: hz,
            settle_ms: 5,
        };
        let carousel_config = CarouselConfig {
            worker_ttl: 1_000,
            poll_interval_ms: 5,
        };
        Engine::with_lifecycle(Lifecycle::new(), &engine_config, &carousel_config)
    }

    #[test]
    fn test_registration_and_removal() {
        let engine = test_engine(100.0);
        let a = engine.block(|_| {}, always(), false);
        let b = engine.stimulate(|_| {}, always(), true);
        let c = engine.looping(|_| {}, always(), false);

        assert_eq!(engine.len(), 3);
        assert_eq!(a.mode(), Mode::Blocking);
        assert!(b.is_muted());
        assert_eq!(c.mode(), Mode::Loop);

        let removed = engine.remove(b.id()).unwrap();
        assert_eq!(removed.id(), b.id());
        assert!(engine.get(b.id()).is_none());
        assert!(matches!(engine.remove(b.id()), Err(EngineError::NeuronNotFound(_))));
        assert_eq!(engine.range().len(), 2);
    }

    #[test]
    fn test_mute_by_id() {
        let engine = test_engine(100.0);
        let neuron = engine.block(|_| {}, always(), false);
        engine.mute_by_id(neuron.id()).unwrap();
        assert!(neuron.is_muted());
        engine.unmute_by_id(neuron.id()).unwrap();
        assert!(!neuron.is_muted());
        assert!(engine.mute_by_id(u64::MAX).is_err());
    }

    #[test]
    fn test_skipped_firing_leaves_stats_untouched() {
        let engine = test_engine(100.0);
        let neuron = engine.block(|_| {}, never(), false);
        let before = neuron.last();
        let now = Instant::now();
        let ctx = Context::new(1, 0, now, Duration::ZERO, RuntimeStats::dormant(now));
        assert!(!engine.fire(&neuron, ctx));
        assert_eq!(neuron.last(), before);
    }

    #[test]
    fn test_blocking_fire_records_refractory_period() {
        let engine = test_engine(100.0);
        let neuron = engine.block(|_| thread::sleep(Duration::from_millis(2)), always(), false);

        let now = Instant::now();
        let ctx = Context::new(1, 0, now, Duration::ZERO, RuntimeStats::dormant(now));
        assert!(engine.fire(&neuron, ctx));
        let first = neuron.last();
        assert_eq!(first.inception, now);
        assert!(first.runtime() >= Duration::from_millis(2));

        thread::sleep(Duration::from_millis(5));
        let later = Instant::now();
        assert!(engine.fire(&neuron, Context::new(2, 1, later, Duration::ZERO, first)));
        let second = neuron.last();
        assert!(second.refractory_period >= Duration::from_millis(5));
        assert!(!neuron.is_executing());
    }

    #[test]
    fn test_fault_is_contained() {
        let engine = test_engine(100.0);
        let neuron = engine.block(|_| panic!("action fault"), always(), false);
        let now = Instant::now();
        let ctx = Context::new(1, 0, now, Duration::ZERO, RuntimeStats::dormant(now));

        assert!(engine.fire(&neuron, ctx));
        assert!(!neuron.is_executing());
        assert_eq!(engine.stats().contained_faults, 1);
    }

    #[test]
    fn test_trigger_fires_once_and_deregisters() {
        let engine = test_engine(100.0);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        engine.trigger(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            always(),
            false,
        );

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_gated_trigger_does_not_fire() {
        let engine = test_engine(100.0);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        engine.trigger(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            never(),
            true,
        );

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_dispatched_trigger_fires_on_the_carousel() {
        let engine = test_engine(100.0);
        let (lane_tx, lane_rx) = crossbeam::channel::unbounded();

        let neuron = engine.trigger(
            move |_| {
                let _ = lane_tx.send(thread::current().name().map(str::to_string));
            },
            always(),
            true,
        );

        let lane = lane_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(lane.unwrap_or_default().starts_with("impulse-carousel-"));
        assert!(engine.is_empty());

        let deadline = Instant::now() + Duration::from_secs(2);
        while neuron.is_executing() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!neuron.is_executing());
    }

    #[test]
    fn test_stop_when_and_callback() {
        let engine = test_engine(500.0);
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        engine.on_stop(move || flag.store(true, Ordering::SeqCst));

        // Loop neuron that outlives the run keeps the beat counter climbing.
        engine.looping(|_| thread::sleep(Duration::from_millis(500)), always(), false);
        engine.stop_when(beat_over(4));

        engine.spark();

        assert!(!engine.is_active());
        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(engine.beat(), 5);
        assert_eq!(engine.stats().total_beats, 5);
    }

    #[test]
    fn test_start_twice_is_an_error() {
        let engine = test_engine(200.0);
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyActive(_))));
        engine.stop();
        assert!(engine.join(Duration::from_secs(2)));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_loop_exits_when_lifecycle_ends() {
        let engine = test_engine(200.0);
        engine.start().unwrap();
        engine.lifecycle().shutdown_now();
        assert!(engine.join(Duration::from_secs(2)));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_frequency_can_change() {
        let engine = test_engine(100.0);
        engine.set_max_frequency(25.0);
        assert_eq!(engine.max_frequency(), 25.0);
    }
}
