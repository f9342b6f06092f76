// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine {0} is already active")]
    AlreadyActive(u64),

    #[error("failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("neuron {0} is not registered with this engine")]
    NeuronNotFound(u64),
}

pub type EngineResult<T> = Result<T, EngineError>;
