use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::key::Key;
use super::traits::{Datastore, Entry, Order, Query};

/// In-memory ordered datastore.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    entries: RwLock<BTreeMap<Key, Vec<u8>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn has(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn put(&self, key: &Key, value: &[u8]) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.clone(), value.to_vec());
        Ok(())
    }

    async fn put_if_absent(&self, key: &Key, value: &[u8]) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.clone(), value.to_vec());
        Ok(true)
    }

    async fn delete(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn query(&self, query: Query) -> Result<Vec<Entry>, StoreError> {
        let entries = self.entries.read().await;
        let prefix = query.prefix;

        // Descendants of `/a` all sort between `/a` and `/a0`, as `0` follows `/`.
        let upper = if prefix.is_root() {
            Bound::Unbounded
        } else {
            Bound::Excluded(Key::new(format!("{}0", prefix.as_str())))
        };
        let matched = entries
            .range((Bound::Excluded(prefix.clone()), upper))
            .filter(|(k, _)| k.is_descendant_of(&prefix));
        let limit = query.limit.unwrap_or(usize::MAX);
        let to_entry = |(k, v): (&Key, &Vec<u8>)| Entry {
            key: k.clone(),
            value: v.clone(),
        };

        Ok(match query.order {
            Order::Ascending => matched.take(limit).map(to_entry).collect(),
            Order::Descending => matched.rev().take(limit).map(to_entry).collect(),
        })
    }
}
