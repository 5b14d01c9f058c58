use async_trait::async_trait;

use super::error::StoreError;
use super::key::Key;

/// Key ordering for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// A range query over every key below `prefix`.
#[derive(Debug, Clone)]
pub struct Query {
    pub prefix: Key,
    pub order: Order,
    /// Maximum number of entries to return. `None` means unbounded.
    pub limit: Option<usize>,
}

impl Query {
    /// All descendants of `prefix`, ascending, unbounded.
    pub fn prefix(prefix: Key) -> Self {
        Self {
            prefix,
            order: Order::Ascending,
            limit: None,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A key/value pair returned by [`Datastore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Vec<u8>,
}

/// Ordered key-value storage.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, StoreError>;

    /// Check whether `key` holds a value.
    async fn has(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &Key, value: &[u8]) -> Result<(), StoreError>;

    /// Atomically store `value` only if `key` is vacant.
    ///
    /// Returns `true` if the value was written, `false` if the key was taken.
    async fn put_if_absent(&self, key: &Key, value: &[u8]) -> Result<bool, StoreError>;

    /// Remove the value under `key`.
    ///
    /// Returns `true` if a value was deleted, `false` if it did not exist.
    async fn delete(&self, key: &Key) -> Result<bool, StoreError>;

    /// Return the entries below `query.prefix` in key order.
    ///
    /// Result keys are absolute within this store.
    async fn query(&self, query: Query) -> Result<Vec<Entry>, StoreError>;
}
