// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dedicated loop
//!
//! Runs a target action on one fixed thread for its whole life, for APIs that
//! demand thread affinity. The stimulator only hands the beat's context to the
//! lane and records the lane's previous cycle as its sample.
//!
//! The handoff queue is bounded; when the lane is still busy and the queue is
//! full, the handoff is dropped rather than blocking the stimulator.

use crate::data::Data;
use crate::dimension::{Dimension, DimensionOptions};
use crate::error::{DimensionError, DimensionResult};
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, TrySendError};
use impulse_engine::fault::contain;
use impulse_engine::{Context, Engine, Lifecycle, Potential, RuntimeStats};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub fn dedicated<F, P>(
    engine: &Engine,
    options: &DimensionOptions,
    action: F,
    potential: P,
) -> DimensionResult<Dimension<RuntimeStats>>
where
    F: FnMut(Context) + Send + 'static,
    P: Potential + 'static,
{
    let dimension = Dimension::build(engine, options, "dedicated", ());
    let (handoff, lane) = bounded::<Context>(options.queue_depth.max(1));
    let last_cycle = Arc::new(Mutex::new(None));

    let name = format!("impulse-dedicated-{}", dimension.id());
    let lane_id = dimension.id();
    let lifecycle = engine.lifecycle().clone();
    let poll = options.consumer_poll;
    let cycles = Arc::clone(&last_cycle);
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || run_lane(lane_id, action, lane, cycles, lifecycle, poll))
        .map_err(|source| DimensionError::ThreadSpawn { name, source })?;

    let weak = dimension.downgrade();
    let stimulator = engine.stimulate(
        move |ctx| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match handoff.try_send(ctx) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => trace!("[DEDICATED] Lane {} busy, handoff dropped", lane_id),
                Err(TrySendError::Disconnected(_)) => return,
            }
            let previous = *last_cycle.lock();
            if let Some(stats) = previous {
                inner.insert(Data::new(ctx, stats));
            }
        },
        potential,
        options.muted,
    );
    dimension.attach_stimulator(stimulator);

    debug!("[DEDICATED] Lane started for '{}'", dimension.name());
    Ok(dimension)
}

fn run_lane<F>(
    id: u64,
    mut action: F,
    lane: Receiver<Context>,
    last_cycle: Arc<Mutex<Option<RuntimeStats>>>,
    lifecycle: Lifecycle,
    poll: Duration,
) where
    F: FnMut(Context),
{
    let mut previous_end: Option<Instant> = None;

    loop {
        match lane.recv_timeout(poll) {
            Ok(ctx) => {
                let start = Instant::now();
                contain("DEDICATED", id, || action(ctx));
                let end = Instant::now();
                *last_cycle.lock() = Some(RuntimeStats {
                    inception: ctx.moment,
                    start,
                    end,
                    refractory_period: previous_end.map_or(Duration::ZERO, |e| start.saturating_duration_since(e)),
                });
                previous_end = Some(end);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !lifecycle.is_alive() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    trace!("[DEDICATED] Lane {} exited", id);
}
