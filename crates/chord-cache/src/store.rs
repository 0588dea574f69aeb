//! Identifier-keyed collection

use chord_core::{Identified, Snowflake};
use std::collections::HashMap;

/// Collection holding at most one entry per identifier
#[derive(Debug, Clone)]
pub struct Store<T> {
    items: HashMap<Snowflake, T>,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<T: Identified + Clone> Store<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry with the same id, returning the replaced entry
    pub fn upsert(&mut self, item: T) -> Option<T> {
        self.items.insert(item.id(), item)
    }

    /// Remove by id; absent ids are a no-op
    pub fn remove(&mut self, id: Snowflake) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn get(&self, id: Snowflake) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: Snowflake) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copies of every entry, ordered by id
    pub fn to_vec(&self) -> Vec<T> {
        let mut items: Vec<T> = self.items.values().cloned().collect();
        items.sort_by_key(|item| item.id());
        items
    }
}

impl<T: Identified + Clone> FromIterator<T> for Store<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Self::new();
        for item in iter {
            store.upsert(item);
        }
        store
    }
}
