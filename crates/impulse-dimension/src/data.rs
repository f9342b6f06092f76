// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use impulse_engine::Context;
use std::time::Instant;

/// One timestamped sample: the value plus the context it was produced in.
#[derive(Debug, Clone, PartialEq)]
pub struct Data<V> {
    pub context: Context,
    pub value: V,
}

impl<V> Data<V> {
    pub fn new(context: Context, value: V) -> Self {
        Self { context, value }
    }

    pub fn moment(&self) -> Instant {
        self.context.moment
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Data<U> {
        Data {
            context: self.context,
            value: f(self.value),
        }
    }
}
