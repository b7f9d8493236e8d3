//! Item-keyed cache with a storage strategy chosen once per map.
//!
//! Items whose hashes can be trusted go into a hash table; anything else goes
//! into a list scanned with item equality. The decision is taken from the first
//! inserted item and held until the map is cleared, so a later item can never
//! move the map into a mode its earlier entries were not stored for.

use std::collections::HashMap;

use crate::item::{HashReliability, Item};

/// The storage strategy an [`IdentityMap`] settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Nothing inserted yet; the strategy is still open.
    Undecided,
    /// Hash-table storage.
    Hashed,
    /// Linear-scan storage.
    Linear,
}

#[derive(Debug)]
enum Storage<V> {
    Empty,
    Hashed(HashMap<Item, V>),
    Linear(Vec<(Item, V)>),
}

/// A mapping from data item to a cached value, at most one entry per
/// equality class.
#[derive(Debug)]
pub struct IdentityMap<V> {
    storage: Storage<V>,
}

impl<V> IdentityMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            storage: Storage::Empty,
        }
    }

    /// Look up the value cached for an item.
    pub fn get(&self, item: &Item) -> Option<&V> {
        match &self.storage {
            Storage::Empty => None,
            Storage::Hashed(map) => map.get(item),
            Storage::Linear(list) => list.iter().find(|(k, _)| k == item).map(|(_, v)| v),
        }
    }

    /// Check whether an equal item is present.
    pub fn contains(&self, item: &Item) -> bool {
        self.get(item).is_some()
    }

    /// Insert a value for an item.
    ///
    /// The first insertion for an equality class wins. Inserting an item that is
    /// already present leaves the existing entry in place and returns `false`;
    /// callers are expected to check [`contains`](Self::contains) first, which is
    /// asserted in debug builds.
    pub fn insert(&mut self, item: Item, value: V) -> bool {
        debug_assert!(!self.contains(&item), "item inserted twice into identity map");

        if let Storage::Empty = self.storage {
            self.storage = match item.hash_reliability() {
                HashReliability::Reliable => Storage::Hashed(HashMap::new()),
                HashReliability::Unreliable => Storage::Linear(Vec::new()),
            };
        }

        match &mut self.storage {
            Storage::Empty => false,
            Storage::Hashed(map) => {
                if map.contains_key(&item) {
                    return false;
                }
                map.insert(item, value);
                true
            }
            Storage::Linear(list) => {
                if list.iter().any(|(k, _)| *k == item) {
                    return false;
                }
                list.push((item, value));
                true
            }
        }
    }

    /// Remove the entry for an item.
    pub fn remove(&mut self, item: &Item) -> Option<V> {
        match &mut self.storage {
            Storage::Empty => None,
            Storage::Hashed(map) => map.remove(item),
            Storage::Linear(list) => {
                let index = list.iter().position(|(k, _)| k == item)?;
                Some(list.remove(index).1)
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Empty => 0,
            Storage::Hashed(map) => map.len(),
            Storage::Linear(list) => list.len(),
        }
    }

    /// Check whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all entries.
    ///
    /// Order is insertion order in linear mode and unspecified in hashed mode.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&Item, &V)> + '_> {
        match &self.storage {
            Storage::Empty => Box::new(std::iter::empty()),
            Storage::Hashed(map) => Box::new(map.iter()),
            Storage::Linear(list) => Box::new(list.iter().map(|(k, v)| (k, v))),
        }
    }

    /// Iterate over the cached values.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Remove the entries matching a predicate, returning how many went.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Item, &V) -> bool,
    {
        let before = self.len();
        match &mut self.storage {
            Storage::Empty => {}
            Storage::Hashed(map) => map.retain(|k, v| keep(k, v)),
            Storage::Linear(list) => list.retain(|(k, v)| keep(k, v)),
        }
        before - self.len()
    }

    /// Drop every entry and re-arm the storage decision.
    pub fn clear(&mut self) {
        self.storage = Storage::Empty;
    }

    /// The storage strategy currently in use.
    pub fn storage_mode(&self) -> StorageMode {
        match self.storage {
            Storage::Empty => StorageMode::Undecided,
            Storage::Hashed(_) => StorageMode::Hashed,
            Storage::Linear(_) => StorageMode::Linear,
        }
    }
}

impl<V> Default for IdentityMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
