// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Short, unique-per-lifecycle labels for anonymous entities.

use impulse_engine::Lifecycle;

/// `"{prefix}-{n}"` with `n` drawn from the process-wide id counter.
pub fn label(prefix: &str) -> String {
    label_with(Lifecycle::global(), prefix)
}

pub fn label_with(lifecycle: &Lifecycle, prefix: &str) -> String {
    format!("{}-{}", prefix, lifecycle.next_id())
}
