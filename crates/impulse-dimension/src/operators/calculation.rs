// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Calculation: a pure function of the beat context, no source dimension.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionOptions};
use impulse_engine::{Context, Engine, Potential};

pub fn calculate<V, F, P>(engine: &Engine, options: &DimensionOptions, f: F, potential: P) -> Dimension<V>
where
    V: Clone + Send + 'static,
    F: Fn(&Context) -> V + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "calculation", ());
    let weak = dimension.downgrade();

    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let value = f(&ctx);
            inner.insert(Data::new(ctx, value));
        },
        potential,
        options.muted,
    );
    dimension.attach_stimulator(stimulator);
    dimension
}
