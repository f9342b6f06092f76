// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Analysis / Integration
//!
//! Reduces every source sample that arrived since the previous cycle into one
//! output value. The integrator receives the dimension's cache, so running
//! aggregates survive between cycles.
//!
//! ## Completion disciplines
//! - [`Discipline::Looping`]: Loop-mode stimulator. Cycles never overlap, results
//!   are appended and always replace `current`.
//! - [`Discipline::Impulsive`]: the batch is selected on the firing lane, then the
//!   integration runs on the carousel. Completions race, so each result is spliced
//!   into the timeline by moment and only replaces `current` when newer.
//!
//! Batch selection advances the cursor on the firing lane in beat order, so a
//! result's consumed boundary and its moment order the same way.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionInner, DimensionOptions};
use impulse_engine::{Context, Engine, Potential};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    Looping,
    Impulsive,
}

/// An analysis dimension plus its consumed-boundary cursor.
pub struct Analysis<V, C = ()> {
    dimension: Dimension<V, C>,
    cursor: Arc<Mutex<Option<Instant>>>,
}

impl<V, C> Analysis<V, C> {
    pub fn dimension(&self) -> &Dimension<V, C> {
        &self.dimension
    }

    pub fn into_dimension(self) -> Dimension<V, C> {
        self.dimension
    }

    /// Moment of the newest source sample consumed so far
    pub fn last_cycle(&self) -> Option<Instant> {
        *self.cursor.lock()
    }
}

impl<V, C> Clone for Analysis<V, C> {
    fn clone(&self) -> Self {
        Self {
            dimension: self.dimension.clone(),
            cursor: Arc::clone(&self.cursor),
        }
    }
}

impl<V, C> Deref for Analysis<V, C> {
    type Target = Dimension<V, C>;

    fn deref(&self) -> &Self::Target {
        &self.dimension
    }
}

/// Snapshot the source samples newer than the cursor and advance it.
///
/// The cursor is left unchanged when nothing new arrived.
fn select<In, SC>(source: &Dimension<In, SC>, cursor: &Mutex<Option<Instant>>) -> Vec<Data<In>>
where
    In: Clone + Send + 'static,
    SC: Send + 'static,
{
    let mut boundary = cursor.lock();
    let batch = match *boundary {
        Some(moment) => source.since(moment),
        None => source.timeline(),
    };
    if let Some(newest) = batch.last() {
        *boundary = Some(newest.moment());
    }
    batch
}

pub fn analyze<In, SC, Out, C, F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    source: &Dimension<In, SC>,
    integrator: F,
    potential: P,
    discipline: Discipline,
    cache: C,
) -> Analysis<Out, C>
where
    In: Clone + Send + Sync + 'static,
    SC: Send + 'static,
    Out: Clone + Send + 'static,
    C: Send + 'static,
    F: Fn(&Context, &mut C, &[Data<In>]) -> Out + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "analysis", cache);
    let cursor = Arc::new(Mutex::new(None));
    let weak = dimension.downgrade();
    let source = source.clone();
    let boundary = Arc::clone(&cursor);

    let stimulator = match discipline {
        Discipline::Looping => engine.looping(
            move |ctx| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let batch = select(&source, &boundary);
                let mut state = inner.lock();
                let value = integrator(&ctx, &mut state.cache, &batch);
                DimensionInner::append_locked(&mut *state, Data::new(ctx, value));
            },
            potential,
            options.muted,
        ),
        Discipline::Impulsive => {
            let carousel = engine.carousel().clone();
            let integrator = Arc::new(integrator);
            engine.block(
                move |ctx| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let batch = select(&source, &boundary);
                    let integrator = Arc::clone(&integrator);
                    carousel.step(move || {
                        let mut state = inner.lock();
                        let value = integrator(&ctx, &mut state.cache, &batch);
                        DimensionInner::insert_locked(&mut *state, Data::new(ctx, value));
                    });
                },
                potential,
                options.muted,
            )
        }
    };
    dimension.attach_stimulator(stimulator);

    Analysis { dimension, cursor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{engine_at, wait_until};
    use impulse_engine::always;
    use std::thread;
    use std::time::Duration;

    fn summing(_: &Context, total: &mut i64, batch: &[Data<i64>]) -> i64 {
        *total += batch.iter().map(|d| d.value).sum::<i64>();
        *total
    }

    #[test]
    fn test_select_advances_cursor_only_on_new_samples() {
        let engine = engine_at(100.0);
        let source: Dimension<i64> = Dimension::new(&engine, &DimensionOptions::new(Duration::from_secs(10)));
        let recorder = source.recorder();
        let cursor = Mutex::new(None);

        assert!(select(&source, &cursor).is_empty());
        assert!(cursor.lock().is_none());

        recorder.emit(1);
        let second = recorder.emit(2);
        let batch = select(&source, &cursor);
        assert_eq!(batch.len(), 2);
        assert_eq!(*cursor.lock(), Some(second.moment()));

        assert!(select(&source, &cursor).is_empty());
        assert_eq!(*cursor.lock(), Some(second.moment()));

        let third = recorder.emit(3);
        let batch = select(&source, &cursor);
        assert_eq!(batch.iter().map(|d| d.value).collect::<Vec<_>>(), vec![3]);
        assert_eq!(*cursor.lock(), Some(third.moment()));
    }

    #[test]
    fn test_looping_analysis_sums_batch() {
        let engine = engine_at(200.0);
        let source: Dimension<i64> = Dimension::new(&engine, &DimensionOptions::new(Duration::from_secs(10)));
        let recorder = source.recorder();
        recorder.emit(1);
        recorder.emit(2);
        let last = recorder.emit(3);

        let analysis = analyze(
            &engine,
            &DimensionOptions::new(Duration::from_secs(10)),
            &source,
            summing,
            always(),
            Discipline::Looping,
            0i64,
        );

        engine.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || analysis.current().is_some()));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));

        assert_eq!(analysis.timeline()[0].value, 6);
        assert_eq!(analysis.current().map(|d| d.value), Some(6));
        assert_eq!(analysis.last_cycle(), Some(last.moment()));
    }

    #[test]
    fn test_impulsive_analysis_keeps_timeline_ordered() {
        let engine = engine_at(500.0);
        let source: Dimension<i64> = Dimension::new(&engine, &DimensionOptions::new(Duration::from_secs(10)));
        let recorder = source.recorder();

        // Alternate slow and fast integrations so completions arrive out of order.
        let analysis = analyze(
            &engine,
            &DimensionOptions::new(Duration::from_secs(10)),
            &source,
            |ctx: &Context, seen: &mut usize, batch: &[Data<i64>]| {
                if ctx.id % 2 == 0 {
                    thread::sleep(Duration::from_millis(8));
                }
                *seen += batch.len();
                batch.len()
            },
            always(),
            Discipline::Impulsive,
            0usize,
        );

        engine.start().unwrap();
        for i in 0..20 {
            recorder.emit(i);
            thread::sleep(Duration::from_millis(2));
        }
        assert!(wait_until(Duration::from_secs(2), || analysis.len() >= 20));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(50));

        let timeline = analysis.timeline();
        for pair in timeline.windows(2) {
            assert!(pair[0].moment() <= pair[1].moment());
        }
        let newest = timeline.iter().map(|d| d.moment()).max();
        assert_eq!(analysis.current().map(|d| d.moment()), newest);
    }
}
