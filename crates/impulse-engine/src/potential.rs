// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Potentials
//!
//! A potential is a predicate over a [`Context`] that gates whether an action
//! may run on a given beat. Potentials must be callable concurrently and
//! repeatedly; the only sanctioned state is the counter owned by [`Pace`].
//!
//! Any `Fn(&Context) -> bool + Send + Sync` is a potential. The constructors in
//! this module cover the common gating patterns and compose with
//! [`PotentialExt`].

use crate::context::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub trait Potential: Send + Sync {
    fn evaluate(&self, ctx: &Context) -> bool;
}

impl<F> Potential for F
where
    F: Fn(&Context) -> bool + Send + Sync,
{
    fn evaluate(&self, ctx: &Context) -> bool {
        self(ctx)
    }
}

/// Replace a zero, negative or NaN rate with the smallest positive rate.
pub fn normalize_frequency(hz: f64) -> f64 {
    if hz > 0.0 {
        hz
    } else {
        f64::MIN_POSITIVE
    }
}

/// Period of one cycle at `hz`, saturating to `Duration::MAX` for tiny rates.
pub fn period_of(hz: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / normalize_frequency(hz)).unwrap_or(Duration::MAX)
}

pub fn always() -> impl Potential {
    |_: &Context| true
}

pub fn never() -> impl Potential {
    |_: &Context| false
}

pub fn on_beat(n: u64) -> impl Potential {
    move |ctx: &Context| ctx.beat == n
}

/// Fires on beats divisible by `n`; `n == 0` never fires.
pub fn every_n_beats(n: u64) -> impl Potential {
    move |ctx: &Context| n != 0 && ctx.beat % n == 0
}

pub fn even_beats() -> impl Potential {
    |ctx: &Context| ctx.beat % 2 == 0
}

pub fn odd_beats() -> impl Potential {
    |ctx: &Context| ctx.beat % 2 == 1
}

pub fn beat_under(n: u64) -> impl Potential {
    move |ctx: &Context| ctx.beat < n
}

pub fn beat_over(n: u64) -> impl Potential {
    move |ctx: &Context| ctx.beat > n
}

/// More than `period` has passed since the last activation's beat.
pub fn after_inception(period: Duration) -> impl Potential {
    move |ctx: &Context| ctx.since_inception() > period
}

/// More than `period` has passed since the last activation finished.
pub fn after_refractory(period: Duration) -> impl Potential {
    move |ctx: &Context| ctx.since_refractory_end() > period
}

pub fn frequency(hz: f64) -> impl Potential {
    after_inception(period_of(hz))
}

/// `frequency(source_hz / divisor)`; a zero divisor normalises like a zero rate.
pub fn resonant_frequency(source_hz: f64, divisor: f64) -> impl Potential {
    let hz = if divisor == 0.0 { 0.0 } else { source_hz / divisor };
    frequency(hz)
}

/// Coarse delay primitive behind [`pace`].
pub trait Throttle: Send + Sync {
    fn resist(&self, iterations: u64);
}

/// Burns `iterations` spin-loop hints on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl Throttle for Spin {
    fn resist(&self, iterations: u64) {
        for _ in 0..iterations {
            std::hint::spin_loop();
        }
    }
}

/// Sleeps for `iterations` times the configured step instead of spinning.
#[derive(Debug, Clone, Copy)]
pub struct Sleep(pub Duration);

impl Throttle for Sleep {
    fn resist(&self, iterations: u64) {
        let steps = u32::try_from(iterations).unwrap_or(u32::MAX);
        std::thread::sleep(self.0.saturating_mul(steps));
    }
}

/// Always-true potential that resists `iterations` before answering.
///
/// This is a deterministic throttle independent of the scheduler's own clock.
/// The counter records how many times the gate has been passed.
#[derive(Debug)]
pub struct Pace<T: Throttle = Spin> {
    iterations: u64,
    throttle: T,
    passes: AtomicU64,
}

impl<T: Throttle> Pace<T> {
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }
}

impl<T: Throttle> Potential for Pace<T> {
    fn evaluate(&self, _ctx: &Context) -> bool {
        self.throttle.resist(self.iterations);
        self.passes.fetch_add(1, Ordering::Relaxed);
        true
    }
}

pub fn pace(iterations: u64) -> Pace<Spin> {
    pace_with(iterations, Spin)
}

pub fn pace_with<T: Throttle>(iterations: u64, throttle: T) -> Pace<T> {
    Pace {
        iterations,
        throttle,
        passes: AtomicU64::new(0),
    }
}

pub struct And<A, B>(A, B);
pub struct Or<A, B>(A, B);
pub struct Not<A>(A);

impl<A: Potential, B: Potential> Potential for And<A, B> {
    fn evaluate(&self, ctx: &Context) -> bool {
        self.0.evaluate(ctx) && self.1.evaluate(ctx)
    }
}

impl<A: Potential, B: Potential> Potential for Or<A, B> {
    fn evaluate(&self, ctx: &Context) -> bool {
        self.0.evaluate(ctx) || self.1.evaluate(ctx)
    }
}

impl<A: Potential> Potential for Not<A> {
    fn evaluate(&self, ctx: &Context) -> bool {
        !self.0.evaluate(ctx)
    }
}

pub trait PotentialExt: Potential + Sized {
    fn and<P: Potential>(self, other: P) -> And<Self, P> {
        And(self, other)
    }

    fn or<P: Potential>(self, other: P) -> Or<Self, P> {
        Or(self, other)
    }

    fn negate(self) -> Not<Self> {
        Not(self)
    }
}

impl<P: Potential> PotentialExt for P {}

pub fn not<P: Potential>(potential: P) -> Not<P> {
    Not(potential)
}

/// True when every member is true (vacuously true when empty).
pub fn all_of(potentials: Vec<Box<dyn Potential>>) -> impl Potential {
    move |ctx: &Context| potentials.iter().all(|p| p.evaluate(ctx))
}

/// True when any member is true (false when empty).
pub fn any_of(potentials: Vec<Box<dyn Potential>>) -> impl Potential {
    move |ctx: &Context| potentials.iter().any(|p| p.evaluate(ctx))
}
