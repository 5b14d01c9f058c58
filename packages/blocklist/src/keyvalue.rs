use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use cid::Cid;
use datastore::{Datastore, Key, Namespaced, Order, Query};

use crate::error::BlocklistError;
use crate::key::ContentKey;
use crate::model::{Action, BlockData, BlocklistItem};
use crate::traits::{AuditObserver, Blocklist, TracingObserver};

/// Namespace shared by all blocklist bookkeeping.
pub const SAFEMODE_PREFIX: &str = "/safemode";
/// Blocklist entries, below [`SAFEMODE_PREFIX`].
pub const BLOCKLIST_PREFIX: &str = "/blocklist";
/// Audit log entries, below [`SAFEMODE_PREFIX`].
pub const AUDIT_PREFIX: &str = "/audit";

/// Blocklist kept in a key-value datastore.
///
/// Entries live in `/safemode/blocklist/<base32 cidv1>`, audit actions in
/// `/safemode/audit/<timestamp>-<uuid>`. The un-namespaced base store holds
/// the content payloads that `purge` deletes.
pub struct DatastoreBlocklist {
    datastore: Arc<dyn Datastore>,
    blocklist: Namespaced,
    audit: Namespaced,
    observer: Arc<dyn AuditObserver>,
}

impl DatastoreBlocklist {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        let safemode: Arc<dyn Datastore> =
            Arc::new(Namespaced::wrap(datastore.clone(), Key::new(SAFEMODE_PREFIX)));
        let blocklist = Namespaced::wrap(safemode.clone(), Key::new(BLOCKLIST_PREFIX));
        let audit = Namespaced::wrap(safemode, Key::new(AUDIT_PREFIX));
        Self {
            datastore,
            blocklist,
            audit,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the sink that receives every logged action.
    pub fn with_observer(mut self, observer: Arc<dyn AuditObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Audit keys sort chronologically: the timestamp has a fixed width and
    /// the v7 uuid keeps actions logged in the same instant apart.
    fn audit_key(action: &Action) -> Key {
        let stamp = action
            .created_at
            .to_rfc3339_opts(SecondsFormat::Nanos, true);
        Key::root().child(format!("{stamp}-{}", uuid::Uuid::now_v7()))
    }
}

#[async_trait]
impl Blocklist for DatastoreBlocklist {
    async fn contains(&self, id: &Cid) -> Result<bool, BlocklistError> {
        let key = ContentKey::from(id);
        Ok(self.blocklist.has(&key.datastore_key()).await?)
    }

    async fn block(&self, id: &Cid, data: &BlockData) -> Result<bool, BlocklistError> {
        let key = ContentKey::from(id);
        let item = BlocklistItem {
            hash: key.to_string(),
            content: data.content.clone(),
            reason: data.reason.clone(),
            user: data.user.clone(),
        };

        let created = self
            .blocklist
            .put_if_absent(&key.datastore_key(), &item.encode()?)
            .await?;
        if created {
            tracing::debug!(hash = %key, user = %data.user, "Blocked content");
        } else {
            tracing::debug!(hash = %key, "Content already blocked");
        }
        Ok(created)
    }

    async fn unblock(&self, id: &Cid) -> Result<(), BlocklistError> {
        let key = ContentKey::from(id);
        if !self.blocklist.delete(&key.datastore_key()).await? {
            return Err(BlocklistError::NotFound(key.to_string()));
        }
        tracing::debug!(hash = %key, "Unblocked content");
        Ok(())
    }

    async fn search(&self, id: &Cid) -> Result<BlocklistItem, BlocklistError> {
        let key = ContentKey::from(id);
        match self.blocklist.get(&key.datastore_key()).await? {
            Some(raw) => BlocklistItem::decode(&raw),
            None => Err(BlocklistError::NotFound(key.to_string())),
        }
    }

    async fn purge(&self, id: &Cid) -> Result<(), BlocklistError> {
        let key = ContentKey::from(id);
        let removed = self.datastore.delete(&key.datastore_key()).await?;
        tracing::debug!(hash = %key, removed, "Purged content");
        Ok(())
    }

    async fn add_log(&self, action: &Action) -> Result<(), BlocklistError> {
        action.validate()?;
        self.observer.record(action);

        self.audit
            .put(&Self::audit_key(action), &action.encode()?)
            .await?;
        Ok(())
    }

    async fn get_logs(&self, limit: usize) -> Result<Vec<Action>, BlocklistError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self
            .audit
            .query(
                Query::prefix(Key::root())
                    .order(Order::Descending)
                    .limit(limit),
            )
            .await?;

        entries
            .iter()
            .map(|entry| Action::decode(&entry.value))
            .collect()
    }
}
