// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dimension and registry error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("failed to spawn consumer thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type DimensionResult<T> = Result<T, DimensionError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("world '{0}' is not registered")]
    WorldNotFound(String),

    #[error("collection '{collection}' is not registered in world '{world}'")]
    CollectionNotFound { world: String, collection: String },

    #[error("collection '{collection}' is already registered in world '{world}'")]
    DuplicateCollection { world: String, collection: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
