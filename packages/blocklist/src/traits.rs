use async_trait::async_trait;
use cid::Cid;
use thiserror::Error;

use crate::error::BlocklistError;
use crate::model::{Action, ActionType, BlockData, BlocklistItem};

/// Decides whether a gateway should refuse to serve, fetch or replicate
/// some content.
///
/// Every operation normalizes the CID first, so a CIDv0 and a CIDv1 of the
/// same hash are the same entry.
#[async_trait]
pub trait Blocklist: Send + Sync {
    /// Returns true if the content referenced by `id` is blocked.
    async fn contains(&self, id: &Cid) -> Result<bool, BlocklistError>;

    /// Add `id` to the list of content we won't touch.
    ///
    /// Returns `true` if the entry was created and `false` if `id` was
    /// already blocked, in which case the first block's metadata is kept.
    async fn block(&self, id: &Cid, data: &BlockData) -> Result<bool, BlocklistError>;

    /// Permanently remove the entry for `id`.
    async fn unblock(&self, id: &Cid) -> Result<(), BlocklistError>;

    /// Metadata about why and by whom `id` was blocked.
    async fn search(&self, id: &Cid) -> Result<BlocklistItem, BlocklistError>;

    /// Delete the stored payload of `id` from the content store. Purging
    /// content that isn't stored is not an error.
    async fn purge(&self, id: &Cid) -> Result<(), BlocklistError>;

    /// Append `action` to the audit log.
    async fn add_log(&self, action: &Action) -> Result<(), BlocklistError>;

    /// The `limit` most recent actions, newest first.
    async fn get_logs(&self, limit: usize) -> Result<Vec<Action>, BlocklistError>;
}

/// Failure of a combined mutate-then-audit operation.
#[derive(Debug, Error)]
pub enum AuditedError {
    /// A block/unblock failed. `applied` lists the ids changed before the
    /// failure; no audit record was written for them.
    #[error("mutation failed after {} change(s): {source}", .applied.len())]
    Mutation {
        applied: Vec<Cid>,
        #[source]
        source: BlocklistError,
    },

    /// Every mutation succeeded but the audit record could not be written.
    /// The mutations are not rolled back.
    #[error("audit log write failed for {} change(s): {source}", .applied.len())]
    Audit {
        applied: Vec<Cid>,
        #[source]
        source: BlocklistError,
    },
}

/// Mutation and audit in one call.
///
/// Automatically implemented for any `Blocklist`.
#[async_trait]
pub trait BlocklistExt: Blocklist {
    /// Block every id in `ids` and log one `block` action covering the ids
    /// that were newly blocked. Returns those ids.
    async fn block_and_log(&self, ids: &[Cid], data: &BlockData) -> Result<Vec<Cid>, AuditedError> {
        let mut applied = Vec::new();
        for id in ids {
            match self.block(id, data).await {
                Ok(true) => applied.push(*id),
                Ok(false) => {}
                Err(source) => return Err(AuditedError::Mutation { applied, source }),
            }
        }
        if applied.is_empty() {
            return Ok(applied);
        }

        let action = Action::new(
            ActionType::Block,
            applied.clone(),
            data.reason.clone(),
            data.user.clone(),
        );
        match self.add_log(&action).await {
            Ok(()) => Ok(applied),
            Err(source) => Err(AuditedError::Audit { applied, source }),
        }
    }

    /// Unblock every id in `ids` and log one `unblock` action covering them.
    /// Ids that were not blocked are skipped. Returns the unblocked ids.
    async fn unblock_and_log(
        &self,
        ids: &[Cid],
        reason: &str,
        user: &str,
    ) -> Result<Vec<Cid>, AuditedError> {
        let mut applied = Vec::new();
        for id in ids {
            match self.unblock(id).await {
                Ok(()) => applied.push(*id),
                Err(BlocklistError::NotFound(_)) => {}
                Err(source) => return Err(AuditedError::Mutation { applied, source }),
            }
        }
        if applied.is_empty() {
            return Ok(applied);
        }

        let action = Action::new(ActionType::Unblock, applied.clone(), reason, user);
        match self.add_log(&action).await {
            Ok(()) => Ok(applied),
            Err(source) => Err(AuditedError::Audit { applied, source }),
        }
    }
}

// Blanket implementation
impl<T: ?Sized + Blocklist> BlocklistExt for T {}

/// Receives every action appended to the audit log.
pub trait AuditObserver: Send + Sync {
    fn record(&self, action: &Action);
}

/// Emits each logged action as a `tracing` info event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AuditObserver for TracingObserver {
    fn record(&self, action: &Action) {
        tracing::info!(target: "blocklist", "{action}");
    }
}
