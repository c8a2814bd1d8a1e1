//! Generic keyed cache of entities of one kind.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cosign_types::Pagination;
use tracing::trace;

use crate::entity::Entity;
use crate::error::StoreError;

struct Inner<T: Entity> {
    entries: HashMap<T::Key, T>,
    /// index name -> index value -> primary keys
    indexes: HashMap<&'static str, HashMap<String, HashSet<T::Key>>>,
}

impl<T: Entity> Inner<T> {
    fn insert(&mut self, entity: T) {
        let key = entity.key();
        for &index in T::INDEXES {
            if let Some(value) = entity.index_value(index) {
                self.indexes
                    .entry(index)
                    .or_default()
                    .entry(value)
                    .or_default()
                    .insert(key.clone());
            }
        }
        self.entries.insert(key, entity);
    }

    fn remove(&mut self, key: &T::Key) -> Option<T> {
        let entity = self.entries.remove(key)?;
        for &index in T::INDEXES {
            let Some(value) = entity.index_value(index) else {
                continue;
            };
            if let Some(by_value) = self.indexes.get_mut(index) {
                if let Some(keys) = by_value.get_mut(&value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        by_value.remove(&value);
                    }
                }
            }
        }
        Some(entity)
    }
}

/// Thread-safe in-memory store of entities keyed by [`Entity::key`].
///
/// Never holds two entries with the same key. Storing an entity equal to the
/// cached one is a no-op; storing a changed one replaces it.
pub struct EntityStore<T: Entity> {
    inner: RwLock<Inner<T>>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                indexes: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner<T>>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned(T::NAME))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner<T>>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned(T::NAME))
    }

    fn check_index(index: &'static str) -> Result<(), StoreError> {
        if T::INDEXES.contains(&index) {
            Ok(())
        } else {
            Err(StoreError::UnknownIndex {
                store: T::NAME,
                index,
            })
        }
    }

    pub fn get(&self, key: &T::Key) -> Result<Option<T>, StoreError> {
        Ok(self.read()?.entries.get(key).cloned())
    }

    pub fn contains(&self, key: &T::Key) -> Result<bool, StoreError> {
        Ok(self.read()?.entries.contains_key(key))
    }

    /// Newest entity whose `index` equals `value`.
    pub fn get_by(&self, index: &'static str, value: &str) -> Result<Option<T>, StoreError> {
        Ok(self.get_all_by(index, value)?.into_iter().next())
    }

    /// Every entity whose `index` equals `value`, newest first.
    pub fn get_all_by(&self, index: &'static str, value: &str) -> Result<Vec<T>, StoreError> {
        Self::check_index(index)?;
        let inner = self.read()?;
        let mut found: Vec<T> = inner
            .indexes
            .get(index)
            .and_then(|by_value| by_value.get(value))
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| inner.entries.get(k).cloned())
                    .collect()
            })
            .unwrap_or_default();
        sort_newest_first(&mut found);
        Ok(found)
    }

    /// Upsert by primary key. Returns how many entries were inserted or replaced.
    pub fn store(&self, entities: impl IntoIterator<Item = T>) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        let mut changed = 0;
        for entity in entities {
            let key = entity.key();
            let existing = inner.entries.get(&key);
            if existing == Some(&entity) {
                continue;
            }
            if existing.is_some() {
                inner.remove(&key);
                trace!(store = T::NAME, ?key, "replacing changed entity");
            }
            inner.insert(entity);
            changed += 1;
        }
        Ok(changed)
    }

    pub fn delete<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> Result<usize, StoreError> {
        let keys: Vec<T::Key> = entities.into_iter().map(Entity::key).collect();
        self.delete_keys(&keys)
    }

    /// Remove by primary key; absent keys are ignored. Returns how many were removed.
    pub fn delete_keys(&self, keys: &[T::Key]) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        Ok(keys.iter().filter(|k| inner.remove(k).is_some()).count())
    }

    /// Every entity, newest first.
    pub fn list(&self) -> Result<Vec<T>, StoreError> {
        let mut all: Vec<T> = self.read()?.entries.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }

    /// Entities inside the pagination window, newest first.
    pub fn list_page(&self, page: &Pagination) -> Result<Vec<T>, StoreError> {
        let mut all = self.list()?;
        all.retain(|e| page.contains(e.created_at()));
        if let Some(limit) = page.limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_newest_first<T: Entity>(entities: &mut [T]) {
    entities.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}
