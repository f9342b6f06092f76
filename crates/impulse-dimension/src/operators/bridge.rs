// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Bridge
//!
//! Feeds a dimension from an external queue instead of a stimulator neuron.
//! A dedicated consumer thread blocks on the inbound channel and stamps every
//! received value with a synthetic, self-incrementing beat. The dimension's
//! trimmer still runs on the owning engine.
//!
//! The consumer exits when the channel disconnects, the lifecycle ends or the
//! dimension is dropped. Values received while the dimension is muted are dropped.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionInner, DimensionOptions};
use crate::error::{DimensionError, DimensionResult};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use impulse_engine::{Context, Engine, RuntimeStats};
use std::sync::Weak;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub fn bridge<V>(engine: &Engine, options: &DimensionOptions, inbound: Receiver<V>) -> DimensionResult<Dimension<V>>
where
    V: Clone + Send + 'static,
{
    let dimension = Dimension::build(engine, options, "bridge", ());
    let weak = dimension.downgrade();
    let poll = options.consumer_poll;
    let name = format!("impulse-bridge-{}", dimension.id());

    thread::Builder::new()
        .name(name.clone())
        .spawn(move || consume(weak, inbound, poll))
        .map_err(|source| DimensionError::ThreadSpawn { name, source })?;

    debug!("[BRIDGE] Consumer started for '{}'", dimension.name());
    Ok(dimension)
}

fn consume<V: Clone>(dimension: Weak<DimensionInner<V, ()>>, inbound: Receiver<V>, poll: Duration) {
    let mut beat: u64 = 0;
    let mut previous: Option<RuntimeStats> = None;

    loop {
        let received = inbound.recv_timeout(poll);
        let Some(inner) = dimension.upgrade() else {
            break;
        };
        if !inner.lifecycle().is_alive() {
            break;
        }

        match received {
            Ok(value) => {
                if inner.is_muted() {
                    trace!("[BRIDGE] Dimension muted, dropping value");
                    continue;
                }
                // Stamped under the dimension lock so concurrent recorders stay ordered.
                let data = inner.stamp(value, |now| {
                    let last_cycle = previous.unwrap_or_else(|| RuntimeStats::dormant(now));
                    Context::new(
                        inner.lifecycle().next_id(),
                        beat,
                        now,
                        now.saturating_duration_since(last_cycle.start),
                        last_cycle,
                    )
                });

                let now = data.moment();
                previous = Some(RuntimeStats {
                    inception: now,
                    start: now,
                    end: Instant::now(),
                    refractory_period: now.saturating_duration_since(data.context.last_cycle.end),
                });
                beat += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    trace!("[BRIDGE] Consumer exited after {} values", beat);
}
