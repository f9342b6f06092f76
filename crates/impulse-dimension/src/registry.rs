// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Universe / World registry
//!
//! A named discovery index: a [`Universe`] maps world names to [`World`]s, a world
//! maps collection names to lists of type-erased dimension handles. The registry
//! owns nothing beyond those handles; dimensions belong to whoever built them.
//!
//! Lookups of unknown names return [`RegistryError`] to the caller.

use crate::dimension::Dimension;
use crate::error::{RegistryError, RegistryResult};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

/// Type-erased view of a dimension.
///
/// Use [`Dimensional::as_any`] to recover the concrete `Dimension<V, C>`.
pub trait Dimensional: Send + Sync + std::fmt::Debug {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
    fn window(&self) -> Duration;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn is_muted(&self) -> bool;
    fn mute(&self);
    fn unmute(&self);
    fn as_any(&self) -> &dyn Any;
}

impl<V, C> Dimensional for Dimension<V, C>
where
    V: Clone + Send + 'static,
    C: Send + 'static,
{
    fn id(&self) -> u64 {
        Dimension::id(self)
    }

    fn name(&self) -> &str {
        Dimension::name(self)
    }

    fn window(&self) -> Duration {
        Dimension::window(self)
    }

    fn len(&self) -> usize {
        Dimension::len(self)
    }

    fn is_muted(&self) -> bool {
        Dimension::is_muted(self)
    }

    fn mute(&self) {
        Dimension::mute(self)
    }

    fn unmute(&self) {
        Dimension::unmute(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub type Collection = Vec<Arc<dyn Dimensional>>;

pub struct World {
    name: String,
    collections: RwLock<AHashMap<String, Collection>>,
}

impl World {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: RwLock::new(AHashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&self, name: &str, collection: Collection) -> RegistryResult<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(RegistryError::DuplicateCollection {
                world: self.name.clone(),
                collection: name.to_string(),
            });
        }
        debug!(
            "[DIMENSION] Registered collection '{}' ({} dimensions) in world '{}'",
            name,
            collection.len(),
            self.name
        );
        collections.insert(name.to_string(), collection);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> RegistryResult<Collection> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| self.missing(name))
    }

    pub fn unregister(&self, name: &str) -> RegistryResult<Collection> {
        self.collections
            .write()
            .remove(name)
            .ok_or_else(|| self.missing(name))
    }

    /// Collection names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn missing(&self, name: &str) -> RegistryError {
        RegistryError::CollectionNotFound {
            world: self.name.clone(),
            collection: name.to_string(),
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("collections", &self.names())
            .finish()
    }
}

#[derive(Default)]
pub struct Universe {
    worlds: RwLock<AHashMap<String, Arc<World>>>,
}

static UNIVERSE: OnceLock<Universe> = OnceLock::new();

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide universe
    pub fn global() -> &'static Universe {
        UNIVERSE.get_or_init(Universe::new)
    }

    /// Get or create the named world.
    pub fn world(&self, name: &str) -> Arc<World> {
        if let Some(world) = self.worlds.read().get(name) {
            return Arc::clone(world);
        }
        let mut worlds = self.worlds.write();
        Arc::clone(
            worlds
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(World::new(name))),
        )
    }

    pub fn lookup(&self, name: &str) -> RegistryResult<Arc<World>> {
        self.worlds
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::WorldNotFound(name.to_string()))
    }

    pub fn lookup_collection(&self, world: &str, collection: &str) -> RegistryResult<Collection> {
        self.lookup(world)?.lookup(collection)
    }

    /// World names, sorted
    pub fn worlds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.worlds.read().keys().cloned().collect();
        names.sort();
        names
    }
}
