// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observation: sample an external mutable cell.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionOptions};
use impulse_engine::{Engine, Potential};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared mutable cell an observation samples from.
#[derive(Debug, Default)]
pub struct Observable<V> {
    cell: Arc<RwLock<V>>,
}

impl<V> Clone for Observable<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V: Clone> Observable<V> {
    pub fn new(value: V) -> Self {
        Self {
            cell: Arc::new(RwLock::new(value)),
        }
    }

    pub fn get(&self) -> V {
        self.cell.read().clone()
    }

    pub fn set(&self, value: V) {
        *self.cell.write() = value;
    }

    pub fn update(&self, f: impl FnOnce(&mut V)) {
        f(&mut self.cell.write());
    }
}

/// Copy the cell's value into a new sample on every firing (Stimulate mode).
pub fn observe<V, P>(engine: &Engine, options: &DimensionOptions, cell: Observable<V>, potential: P) -> Dimension<V>
where
    V: Clone + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "observation", ());
    let weak = dimension.downgrade();

    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.insert(Data::new(ctx, cell.get()));
        },
        potential,
        options.muted,
    );
    dimension.attach_stimulator(stimulator);
    dimension
}
