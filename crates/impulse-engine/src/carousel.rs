// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Carousel
//!
//! Elastic pool of reusable worker threads. The pool grows when every worker is
//! busy and shrinks as workers retire after `ttl` actions.
//!
//! ## Design
//! - FIFO of workers, each with a single-slot inbound queue
//! - `step` reuses the first idle worker (moving it to the back) or spawns one
//! - Hand-off and retirement both happen under the pool lock, so a job is never
//!   sent to a worker that is about to exit

use crate::fault::contain;
use crate::lifecycle::Lifecycle;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use impulse_config::CarouselConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    id: u64,
    slot: Sender<Job>,
    running: AtomicBool,
    alive: AtomicBool,
}

impl Worker {
    fn is_available(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.running.load(Ordering::Acquire)
    }
}

type WorkerQueue = Arc<Mutex<VecDeque<Arc<Worker>>>>;

#[derive(Clone)]
pub struct Carousel {
    lifecycle: Lifecycle,
    ttl: u64,
    poll_interval: Duration,
    workers: WorkerQueue,
    spawned: Arc<AtomicUsize>,
}

impl Carousel {
    pub fn new(lifecycle: Lifecycle, config: &CarouselConfig) -> Self {
        Self::with_ttl(lifecycle, config.worker_ttl, config.poll_interval())
    }

    /// A `ttl` of zero is treated as one action per worker.
    pub fn with_ttl(lifecycle: Lifecycle, ttl: u64, poll_interval: Duration) -> Self {
        Self {
            lifecycle,
            ttl: ttl.max(1),
            poll_interval,
            workers: Arc::new(Mutex::new(VecDeque::new())),
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hand `action` to an idle worker, spawning one if none is free.
    ///
    /// Returns `false` if the action was dropped unrun because the lifecycle has
    /// ended. A dropped action releases whatever it captured.
    pub fn step<F>(&self, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.lifecycle.is_alive() {
            debug!("[CAROUSEL] Lifecycle ended, dropping submitted action");
            return false;
        }

        let mut job: Job = Box::new(action);
        let mut workers = self.workers.lock();
        workers.retain(|w| w.alive.load(Ordering::Acquire));

        let available = workers.iter().position(|w| w.is_available());
        let reusable = available.and_then(|index| workers.remove(index));

        let worker = match reusable {
            Some(worker) => worker,
            None => match self.spawn_worker() {
                Ok(worker) => worker,
                Err(e) => {
                    drop(workers);
                    warn!("[CAROUSEL] Failed to spawn worker, running inline: {}", e);
                    contain("CAROUSEL", 0, job);
                    return true;
                }
            },
        };

        worker.running.store(true, Ordering::Release);
        match worker.slot.try_send(job) {
            Ok(()) => {
                workers.push_back(worker);
                return true;
            }
            Err(TrySendError::Full(returned)) | Err(TrySendError::Disconnected(returned)) => {
                warn!("[CAROUSEL] Worker {} rejected hand-off, running inline", worker.id);
                worker.alive.store(false, Ordering::Release);
                job = returned;
            }
        }
        drop(workers);
        contain("CAROUSEL", worker.id, job);
        true
    }

    /// Workers currently alive
    pub fn len(&self) -> usize {
        self.workers
            .lock()
            .iter()
            .filter(|w| w.alive.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Workers currently executing an action
    pub fn busy(&self) -> usize {
        self.workers
            .lock()
            .iter()
            .filter(|w| w.alive.load(Ordering::Acquire) && w.running.load(Ordering::Acquire))
            .count()
    }

    /// Total workers ever created
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }

    fn spawn_worker(&self) -> std::io::Result<Arc<Worker>> {
        let (slot, inbox) = bounded::<Job>(1);
        let worker = Arc::new(Worker {
            id: self.lifecycle.next_id(),
            slot,
            running: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        });

        let lane = Arc::clone(&worker);
        let lifecycle = self.lifecycle.clone();
        let workers = Arc::clone(&self.workers);
        let ttl = self.ttl;
        let poll_interval = self.poll_interval;

        thread::Builder::new()
            .name(format!("impulse-carousel-{}", worker.id))
            .spawn(move || worker_loop(lane, inbox, workers, lifecycle, ttl, poll_interval))?;

        let total = self.spawned.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("[CAROUSEL] Spawned worker {} ({} total)", worker.id, total);
        Ok(worker)
    }
}

fn worker_loop(
    worker: Arc<Worker>,
    inbox: Receiver<Job>,
    workers: WorkerQueue,
    lifecycle: Lifecycle,
    ttl: u64,
    poll_interval: Duration,
) {
    let mut remaining = ttl;

    loop {
        match inbox.recv_timeout(poll_interval) {
            Ok(job) => {
                worker.running.store(true, Ordering::Release);
                contain("CAROUSEL", worker.id, job);
                remaining = remaining.saturating_sub(1);

                if remaining == 0 || !lifecycle.is_alive() {
                    break;
                }
                worker.running.store(false, Ordering::Release);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !lifecycle.is_alive() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    {
        let _pool = workers.lock();
        worker.alive.store(false, Ordering::Release);
        worker.running.store(false, Ordering::Release);
    }

    // A hand-off that raced with retirement is still honoured. Once the lifecycle
    // has ended the job is dropped unrun, which releases its captures.
    while let Ok(job) = inbox.try_recv() {
        if lifecycle.is_alive() {
            contain("CAROUSEL", worker.id, job);
        } else {
            drop(job);
        }
    }

    trace!("[CAROUSEL] Worker {} retired", worker.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn test_sequential_steps_reuse_one_worker() {
        let carousel = Carousel::with_ttl(Lifecycle::new(), 1_000, Duration::from_millis(10));
        let (done_tx, done_rx) = unbounded();

        for i in 0..20 {
            let tx = done_tx.clone();
            carousel.step(move || {
                let _ = tx.send(i);
            });
            assert_eq!(done_rx.recv_timeout(Duration::from_secs(2)).unwrap(), i);
            assert!(wait_until(Duration::from_secs(2), || carousel.busy() == 0));
        }

        assert_eq!(carousel.spawned(), 1);
        assert_eq!(carousel.len(), 1);
    }

    #[test]
    fn test_concurrent_steps_grow_the_pool() {
        let carousel = Carousel::with_ttl(Lifecycle::new(), 1_000, Duration::from_millis(10));
        let (release_tx, release_rx) = unbounded::<()>();
        let (started_tx, started_rx) = unbounded::<()>();

        for _ in 0..4 {
            let release = release_rx.clone();
            let started = started_tx.clone();
            carousel.step(move || {
                let _ = started.send(());
                let _ = release.recv_timeout(Duration::from_secs(5));
            });
        }
        for _ in 0..4 {
            started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }

        assert_eq!(carousel.spawned(), 4);
        assert_eq!(carousel.busy(), 4);

        for _ in 0..4 {
            release_tx.send(()).unwrap();
        }
        assert!(wait_until(Duration::from_secs(2), || carousel.busy() == 0));
        assert!(carousel.spawned() <= 4);
    }

    #[test]
    fn test_workers_retire_after_ttl() {
        let carousel = Carousel::with_ttl(Lifecycle::new(), 2, Duration::from_millis(10));
        let (done_tx, done_rx) = unbounded();

        for _ in 0..2 {
            let tx = done_tx.clone();
            carousel.step(move || {
                let _ = tx.send(());
            });
            done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert!(wait_until(Duration::from_secs(2), || carousel.busy() == 0));
        }

        assert!(wait_until(Duration::from_secs(2), || carousel.is_empty()));

        let tx = done_tx.clone();
        carousel.step(move || {
            let _ = tx.send(());
        });
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(carousel.spawned(), 2);
    }

    #[test]
    fn test_workers_exit_when_lifecycle_ends() {
        let lifecycle = Lifecycle::new();
        let carousel = Carousel::with_ttl(lifecycle.clone(), 1_000, Duration::from_millis(5));
        let (done_tx, done_rx) = unbounded();
        carousel.step(move || {
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        lifecycle.shutdown_now();
        assert!(wait_until(Duration::from_secs(2), || carousel.is_empty()));

        let (late_tx, late_rx) = unbounded::<()>();
        assert!(!carousel.step(move || {
            let _ = late_tx.send(());
        }));
        assert!(late_rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_refused_action_releases_its_captures() {
        let lifecycle = Lifecycle::new();
        let carousel = Carousel::with_ttl(lifecycle.clone(), 1_000, Duration::from_millis(5));
        let held = Arc::new(());
        let capture = Arc::clone(&held);
        assert!(carousel.step(|| {}));

        lifecycle.shutdown_now();
        assert!(!carousel.step(move || drop(capture)));
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn test_panicking_action_does_not_kill_worker() {
        let carousel = Carousel::with_ttl(Lifecycle::new(), 1_000, Duration::from_millis(10));
        carousel.step(|| panic!("worker fault"));
        assert!(wait_until(Duration::from_secs(2), || carousel.busy() == 0));

        let (done_tx, done_rx) = unbounded();
        carousel.step(move || {
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(carousel.spawned(), 1);
    }
}
