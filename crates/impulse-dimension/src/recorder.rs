// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Push adapter for producers outside the beat-driven pull model.

use crate::data::Data;
use crate::dimension::Dimension;
use impulse_engine::{Context, RuntimeStats};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Appends values to a target dimension, stamped with the instant of the call.
///
/// Emission bypasses potential gating. Moments are taken under the target's lock,
/// so samples cannot be back-dated and concurrent emitters stay ordered.
pub struct Recorder<V, C = ()> {
    target: Dimension<V, C>,
    previous: Arc<Mutex<Option<RuntimeStats>>>,
}

impl<V, C> Clone for Recorder<V, C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            previous: Arc::clone(&self.previous),
        }
    }
}

impl<V, C> Recorder<V, C>
where
    V: Clone + Send + 'static,
    C: Send + 'static,
{
    pub fn new(target: Dimension<V, C>) -> Self {
        Self {
            target,
            previous: Arc::new(Mutex::new(None)),
        }
    }

    pub fn target(&self) -> &Dimension<V, C> {
        &self.target
    }

    pub fn emit(&self, value: V) -> Data<V> {
        let inner = self.target.inner();
        let id = inner.lifecycle().next_id();
        inner.stamp(value, |now| {
            let mut previous = self.previous.lock();
            let last_cycle = previous.unwrap_or_else(|| RuntimeStats::dormant(now));
            let stats = RuntimeStats {
                inception: now,
                start: now,
                end: now,
                refractory_period: now.saturating_duration_since(last_cycle.end),
            };
            *previous = Some(stats);
            Context::new(id, 0, now, now.saturating_duration_since(last_cycle.start), last_cycle)
        })
    }

    /// Moment of the most recent emission
    pub fn last_emitted(&self) -> Option<Instant> {
        self.previous.lock().map(|stats| stats.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimensionOptions;
    use impulse_config::{CarouselConfig, EngineConfig};
    use impulse_engine::{Engine, Lifecycle};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_emit_appends_in_order() {
        let engine = Engine::with_lifecycle(Lifecycle::new(), &EngineConfig::default(), &CarouselConfig::default());
        let dimension: Dimension<u32> = Dimension::new(&engine, &DimensionOptions::new(Duration::from_secs(10)));
        let recorder = dimension.recorder();

        let before = Instant::now();
        recorder.emit(1);
        thread::sleep(Duration::from_millis(2));
        let second = recorder.emit(2);

        assert!(second.moment() >= before);
        assert!(second.context.period >= Duration::from_millis(2));
        assert_eq!(recorder.last_emitted(), Some(second.moment()));

        let timeline = dimension.timeline();
        assert_eq!(timeline.iter().map(|d| d.value).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(dimension.current().map(|d| d.value), Some(2));
    }

    #[test]
    fn test_concurrent_emitters_stay_ordered() {
        let engine = Engine::with_lifecycle(Lifecycle::new(), &EngineConfig::default(), &CarouselConfig::default());
        let dimension: Dimension<usize> = Dimension::new(&engine, &DimensionOptions::new(Duration::from_secs(10)));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let recorder = dimension.recorder();
                thread::spawn(move || {
                    for i in 0..50 {
                        recorder.emit(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(dimension.len(), 200);
        dimension.with_timeline(|timeline| {
            for (a, b) in timeline.iter().zip(timeline.iter().skip(1)) {
                assert!(a.moment() <= b.moment());
            }
        });
    }
}
