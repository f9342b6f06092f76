// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blend: a binary operator over the current values of two dimensions.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionOptions};
use impulse_engine::{Engine, Potential};

/// Combined value plus the operand samples it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Blended<A, B, Out> {
    pub a: Data<A>,
    pub b: Data<B>,
    pub value: Out,
}

/// Stimulate-mode blend; firings before both sources have a value are skipped.
pub fn blend<A, SA, B, SB, Out, F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    a: &Dimension<A, SA>,
    b: &Dimension<B, SB>,
    f: F,
    potential: P,
) -> Dimension<Blended<A, B, Out>>
where
    A: Clone + Send + Sync + 'static,
    SA: Send + 'static,
    B: Clone + Send + Sync + 'static,
    SB: Send + 'static,
    Out: Clone + Send + 'static,
    F: Fn(&A, &B) -> Out + Send + Sync + 'static,
    P: Potential + 'static,
{
    wire(engine, options, "blend", a, b, f, potential)
}

pub(crate) fn wire<A, SA, B, SB, Out, F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    prefix: &str,
    a: &Dimension<A, SA>,
    b: &Dimension<B, SB>,
    f: F,
    potential: P,
) -> Dimension<Blended<A, B, Out>>
where
    A: Clone + Send + Sync + 'static,
    SA: Send + 'static,
    B: Clone + Send + Sync + 'static,
    SB: Send + 'static,
    Out: Clone + Send + 'static,
    F: Fn(&A, &B) -> Out + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, prefix, ());
    let weak = dimension.downgrade();
    let (a, b) = (a.clone(), b.clone());

    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // One source lock at a time.
            let Some(left) = a.current() else {
                return;
            };
            let Some(right) = b.current() else {
                return;
            };
            let value = f(&left.value, &right.value);
            inner.insert(Data::new(
                ctx,
                Blended {
                    a: left,
                    b: right,
                    value,
                },
            ));
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
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_blend_mixed_types() {
        let engine = engine_at(500.0);
        let options = DimensionOptions::new(Duration::from_secs(5));
        let label: Dimension<String> = Dimension::new(&engine, &options);
        let count: Dimension<u32> = Dimension::new(&engine, &options);
        label.recorder().emit("left".to_string());
        count.recorder().emit(3);

        let blended = blend(&engine, &options, &label, &count, |l, c| format!("{l}x{c}"), always());
        engine.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || blended.current().is_some()));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));

        let sample = blended.current().unwrap();
        assert_eq!(sample.value.value, "leftx3");
        assert_eq!(sample.value.a.value, "left");
        assert_eq!(sample.value.b.value, 3);
    }

    #[test]
    fn test_blend_waits_for_both_operands() {
        let engine = engine_at(500.0);
        let options = DimensionOptions::new(Duration::from_secs(5));
        let a: Dimension<i32> = Dimension::new(&engine, &options);
        let b: Dimension<i32> = Dimension::new(&engine, &options);
        a.recorder().emit(1);

        let sum = blend(&engine, &options, &a, &b, |x, y| x + y, always());
        engine.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(sum.is_empty());

        b.recorder().emit(2);
        assert!(wait_until(Duration::from_secs(2), || sum.current().is_some()));
        engine.stop();
        assert!(engine.join(Duration::from_secs(5)));
        assert_eq!(sum.current().map(|d| d.value.value), Some(3));
    }
}
