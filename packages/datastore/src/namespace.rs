use std::sync::Arc;

use async_trait::async_trait;

use super::error::StoreError;
use super::key::Key;
use super::traits::{Datastore, Entry, Query};

/// A view of another datastore with every key nested under `prefix`.
///
/// Keys passed in are relative to the namespace; keys returned by
/// [`Datastore::query`] are stripped back to namespace-relative form.
#[derive(Clone)]
pub struct Namespaced {
    inner: Arc<dyn Datastore>,
    prefix: Key,
}

impl Namespaced {
    pub fn wrap(inner: Arc<dyn Datastore>, prefix: Key) -> Self {
        Self { inner, prefix }
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    fn outer(&self, key: &Key) -> Key {
        self.prefix.join(key)
    }
}

#[async_trait]
impl Datastore for Namespaced {
    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(&self.outer(key)).await
    }

    async fn has(&self, key: &Key) -> Result<bool, StoreError> {
        self.inner.has(&self.outer(key)).await
    }

    async fn put(&self, key: &Key, value: &[u8]) -> Result<(), StoreError> {
        self.inner.put(&self.outer(key), value).await
    }

    async fn put_if_absent(&self, key: &Key, value: &[u8]) -> Result<bool, StoreError> {
        self.inner.put_if_absent(&self.outer(key), value).await
    }

    async fn delete(&self, key: &Key) -> Result<bool, StoreError> {
        self.inner.delete(&self.outer(key)).await
    }

    async fn query(&self, query: Query) -> Result<Vec<Entry>, StoreError> {
        let inner_query = Query {
            prefix: self.outer(&query.prefix),
            ..query
        };
        let entries = self.inner.query(inner_query).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                entry.key.strip_prefix(&self.prefix).map(|key| Entry {
                    key,
                    value: entry.value,
                })
            })
            .collect())
    }
}
