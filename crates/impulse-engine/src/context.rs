// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Temporal context handed to potentials and actions.

use std::time::{Duration, Instant};

/// Timestamps bounding one activation of a neuron or one engine cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Moment of the beat that triggered the activation
    pub inception: Instant,
    pub start: Instant,
    pub end: Instant,
    /// `start - previous end`
    pub refractory_period: Duration,
}

impl RuntimeStats {
    /// Stats for something that has never run, anchored at `at`.
    pub fn dormant(at: Instant) -> Self {
        Self {
            inception: at,
            start: at,
            end: at,
            refractory_period: Duration::ZERO,
        }
    }

    pub fn runtime(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

/// Immutable description of "now" for one beat.
///
/// Built fresh by the engine for every beat, then specialised per neuron with
/// that neuron's own `last_activation` before its potential is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub id: u64,
    pub beat: u64,
    pub moment: Instant,
    /// Elapsed time since the previous beat started
    pub period: Duration,
    pub last_cycle: RuntimeStats,
    pub last_activation: RuntimeStats,
}

impl Context {
    pub fn new(id: u64, beat: u64, moment: Instant, period: Duration, last_cycle: RuntimeStats) -> Self {
        Self {
            id,
            beat,
            moment,
            period,
            last_cycle,
            last_activation: RuntimeStats::dormant(moment),
        }
    }

    pub fn with_last_activation(mut self, last: RuntimeStats) -> Self {
        self.last_activation = last;
        self
    }

    /// Time since the last activation's beat moment
    pub fn since_inception(&self) -> Duration {
        self.moment.saturating_duration_since(self.last_activation.inception)
    }

    /// Time since the last activation finished
    pub fn since_refractory_end(&self) -> Duration {
        self.moment.saturating_duration_since(self.last_activation.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_helpers() {
        let origin = Instant::now();
        let last = RuntimeStats {
            inception: origin,
            start: origin + Duration::from_millis(1),
            end: origin + Duration::from_millis(4),
            refractory_period: Duration::ZERO,
        };
        let ctx = Context::new(1, 3, origin + Duration::from_millis(10), Duration::from_millis(2), last)
            .with_last_activation(last);

        assert_eq!(ctx.since_inception(), Duration::from_millis(10));
        assert_eq!(ctx.since_refractory_end(), Duration::from_millis(6));
        assert_eq!(last.runtime(), Duration::from_millis(3));
    }

    #[test]
    fn test_elapsed_saturates_for_future_stats() {
        let now = Instant::now();
        let future = RuntimeStats::dormant(now + Duration::from_secs(1));
        let ctx = Context::new(1, 0, now, Duration::ZERO, future).with_last_activation(future);
        assert_eq!(ctx.since_inception(), Duration::ZERO);
    }
}
