// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Multiplex
//!
//! N-ary operator over heterogeneous dimensions. Sources are read through the
//! [`Tap`] capability, which converts their current value into a [`Signal`].

use crate::data::Data;
use crate::dimension::{Dimension, DimensionOptions};
use impulse_engine::{Engine, Potential};
use std::fmt;
use std::sync::Arc;

/// Tagged value exchanged at the multiplexing boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Signal {
    /// Numeric view; booleans map to 0.0 / 1.0, text is not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Signal::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Signal::Int(i) => Some(*i as f64),
            Signal::Float(f) => Some(*f),
            Signal::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Signal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Signal::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bool(b) => write!(f, "{b}"),
            Signal::Int(i) => write!(f, "{i}"),
            Signal::Float(x) => write!(f, "{x}"),
            Signal::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        Signal::Bool(value)
    }
}

impl From<i32> for Signal {
    fn from(value: i32) -> Self {
        Signal::Int(value.into())
    }
}

impl From<i64> for Signal {
    fn from(value: i64) -> Self {
        Signal::Int(value)
    }
}

impl From<u32> for Signal {
    fn from(value: u32) -> Self {
        Signal::Int(value.into())
    }
}

impl From<f32> for Signal {
    fn from(value: f32) -> Self {
        Signal::Float(value.into())
    }
}

impl From<f64> for Signal {
    fn from(value: f64) -> Self {
        Signal::Float(value)
    }
}

impl From<String> for Signal {
    fn from(value: String) -> Self {
        Signal::Text(value)
    }
}

impl From<&str> for Signal {
    fn from(value: &str) -> Self {
        Signal::Text(value.to_string())
    }
}

/// Read access to a source's current value as a [`Signal`].
pub trait Tap: Send + Sync {
    fn signal(&self) -> Option<Data<Signal>>;
}

impl<V, C> Tap for Dimension<V, C>
where
    V: Clone + Send + Into<Signal> + 'static,
    C: Send + 'static,
{
    fn signal(&self) -> Option<Data<Signal>> {
        self.current().map(|data| data.map(Into::into))
    }
}

/// Stimulate-mode multiplex; a firing is skipped while any source has no value.
pub fn multiplex<Out, F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    sources: Vec<Arc<dyn Tap>>,
    f: F,
    potential: P,
) -> Dimension<Out>
where
    Out: Clone + Send + 'static,
    F: Fn(&[Signal]) -> Out + Send + Sync + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "multiplex", ());
    let weak = dimension.downgrade();

    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let signals: Option<Vec<Signal>> = sources
                .iter()
                .map(|source| source.signal().map(|data| data.value))
                .collect();
            let Some(signals) = signals else {
                return;
            };
            inner.insert(Data::new(ctx, f(&signals)));
        },
        potential,
        options.muted,
    );
    dimension.attach_stimulator(stimulator);
    dimension
}
