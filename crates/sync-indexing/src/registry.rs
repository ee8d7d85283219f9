//! Index registry.
//!
//! Holds the current set of [`IndexDefinition`]s as an immutable snapshot
//! behind an `Arc`. Readers clone the `Arc` under a short read lock and then
//! work on the snapshot without holding any lock. Writers are serialized by a
//! separate mutex, build a complete new snapshot, and publish it with a single
//! pointer swap, so readers never see a half-applied change.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use sync_types::{IndexDefinition, SyncError};

use crate::error::IndexingError;

/// Immutable view of the registered indexes at one point in time.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    indices: Vec<Arc<IndexDefinition>>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i32, usize>,
}

impl RegistrySnapshot {
    fn build(definitions: Vec<Arc<IndexDefinition>>) -> Result<Self, IndexingError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        let mut by_id = HashMap::with_capacity(definitions.len());

        for (pos, def) in definitions.iter().enumerate() {
            def.validate()?;
            if by_name.insert(def.name_key(), pos).is_some() {
                return Err(IndexingError::DuplicateIndex(def.name.clone()));
            }
            if by_id.insert(def.id, pos).is_some() {
                return Err(IndexingError::DuplicateIndexId(def.id));
            }
        }

        Ok(Self {
            indices: definitions,
            by_name,
            by_id,
        })
    }

    /// Look up by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Arc<IndexDefinition>> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&pos| &self.indices[pos])
    }

    /// Look up by id.
    pub fn get_by_id(&self, id: i32) -> Option<&Arc<IndexDefinition>> {
        self.by_id.get(&id).map(|&pos| &self.indices[pos])
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexDefinition>> {
        self.indices.iter()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Check a set of definitions for problems [`IndexRegistry::set_indices`] would reject.
pub fn validate_definitions(definitions: &[IndexDefinition]) -> Result<(), IndexingError> {
    RegistrySnapshot::build(definitions.iter().cloned().map(Arc::new).collect()).map(|_| ())
}

/// Process-wide store of index definitions, shared by reference.
pub struct IndexRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    write_lock: Mutex<()>,
}

impl IndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a registry pre-populated with `definitions`.
    pub fn with_indices(definitions: Vec<IndexDefinition>) -> Result<Self, IndexingError> {
        let registry = Self::new();
        registry.set_indices(definitions)?;
        Ok(registry)
    }

    /// Current snapshot. Cheap: one `Arc` clone under a read lock.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: RegistrySnapshot) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(snapshot);
    }

    /// Atomically replace the whole set of definitions.
    ///
    /// Fails without changing anything if the new set contains duplicate
    /// names or ids.
    pub fn set_indices(&self, definitions: Vec<IndexDefinition>) -> Result<(), IndexingError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot =
            RegistrySnapshot::build(definitions.into_iter().map(Arc::new).collect())?;
        let count = snapshot.len();
        self.publish(snapshot);

        info!(count, "Replaced index definitions");
        Ok(())
    }

    /// Register a new definition.
    ///
    /// # Errors
    ///
    /// Returns [`IndexingError::DuplicateIndex`] if an index with the same
    /// name (case-insensitive) is already registered.
    pub fn add_index(&self, definition: IndexDefinition) -> Result<(), IndexingError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        if current.get(&definition.name).is_some() {
            return Err(IndexingError::DuplicateIndex(definition.name));
        }

        let name = definition.name.clone();
        let mut definitions = current.indices.clone();
        definitions.push(Arc::new(definition));
        self.publish(RegistrySnapshot::build(definitions)?);

        info!(index = %name, "Added index definition");
        Ok(())
    }

    /// Replace the definition sharing `definition.id` (an admin edit).
    ///
    /// The name may change, but not to one used by another index.
    pub fn update_index(&self, definition: IndexDefinition) -> Result<(), IndexingError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let Some(&pos) = current.by_id.get(&definition.id) else {
            return Err(IndexingError::UnknownIndex(format!("id {}", definition.id)));
        };

        let name = definition.name.clone();
        let mut definitions = current.indices.clone();
        definitions[pos] = Arc::new(definition);
        self.publish(RegistrySnapshot::build(definitions)?);

        info!(index = %name, "Updated index definition");
        Ok(())
    }

    /// Remove the definition with the given id. Returns whether one was removed.
    pub fn remove_index(&self, id: i32) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot();
        let Some(&pos) = current.by_id.get(&id) else {
            debug!(id, "Remove requested for unknown index id");
            return false;
        };

        let mut definitions = current.indices.clone();
        let removed = definitions.remove(pos);

        match RegistrySnapshot::build(definitions) {
            Ok(snapshot) => self.publish(snapshot),
            Err(e) => {
                warn!(id, error = %e, "Registry rejected removal");
                return false;
            }
        }

        info!(index = %removed.name, id, "Removed index definition");
        true
    }

    /// Look up a definition by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an empty name.
    pub fn get_index(&self, name: &str) -> Result<Option<Arc<IndexDefinition>>, IndexingError> {
        if name.trim().is_empty() {
            return Err(SyncError::missing("index_name").into());
        }
        Ok(self.snapshot().get(name).cloned())
    }

    /// Look up a definition by id.
    pub fn get_index_by_id(&self, id: i32) -> Option<Arc<IndexDefinition>> {
        self.snapshot().get_by_id(id).cloned()
    }

    /// All definitions as of this call, in registration order.
    pub fn get_all_indices(&self) -> Vec<Arc<IndexDefinition>> {
        self.snapshot().indices.clone()
    }

    /// Whether an index with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self::new()
    }
}
