// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reaction: sample, then call back with the previous and new samples.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionInner, DimensionOptions};
use impulse_engine::{Context, Engine, Potential};

/// Stimulate-mode sampler whose callback sees `(previous, new)`.
///
/// Samples may complete out of order, so `previous` is the newest sample older
/// than `new` (never a later one), or `None` if there is none. The callback runs
/// after the dimension's lock is released.
pub fn react<V, S, F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    sample: S,
    reaction: F,
    potential: P,
) -> Dimension<V>
where
    V: Clone + Send + 'static,
    S: Fn(&Context) -> V + Send + Sync + 'static,
    F: Fn(Option<&Data<V>>, &Data<V>) + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "reaction", ());
    let weak = dimension.downgrade();

    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let data = Data::new(ctx, sample(&ctx));
            let previous = {
                let mut state = inner.lock();
                let moment = data.moment();
                let older = state.timeline.partition_point(|d| d.moment() < moment);
                let previous = match older.checked_sub(1) {
                    Some(index) => state.timeline.get(index).cloned(),
                    None => state.current.clone().filter(|c| c.moment() < moment),
                };
                DimensionInner::insert_locked(&mut *state, data.clone());
                previous
            };
            reaction(previous.as_ref(), &data);
        },
        potential,
        options.muted,
    );
    dimension.attach_stimulator(stimulator);
    dimension
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{engine_at, wait_until};
    use impulse_engine::always;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_reaction_sees_previous_sample() {
        let engine = engine_at(200.0);
        let pairs = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&pairs);

        let dimension = react(
            &engine,
            &DimensionOptions::new(Duration::from_secs(5)),
            |ctx| ctx.id,
            move |previous, new| {
                log.lock().push((previous.map(|p| p.value), new.value));
            },
            always(),
        );

        engine.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || pairs.lock().len() >= 3));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));

        let pairs = pairs.lock();
        assert!(pairs.iter().any(|(previous, _)| previous.is_none()));
        assert!(pairs.iter().any(|(previous, _)| previous.is_some()));
        assert!(dimension.len() >= 3);
    }

    #[test]
    fn test_late_sample_never_sees_a_newer_previous() {
        let engine = engine_at(500.0);
        let steps = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&steps);
        let slow = Arc::new(AtomicBool::new(true));

        // The first sample finishes well after later beats have landed.
        let _dimension = react(
            &engine,
            &DimensionOptions::new(Duration::from_secs(5)),
            move |_| {
                if slow.swap(false, Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(30));
                }
            },
            move |previous, new| {
                log.lock().push((previous.map(|p| p.moment()), new.moment()));
            },
            always(),
        );

        engine.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || steps.lock().len() >= 20));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(40));

        let steps = steps.lock();
        assert!(steps
            .iter()
            .all(|(previous, new)| previous.map_or(true, |previous| previous < *new)));
    }
}
