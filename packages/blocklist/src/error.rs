use datastore::StoreError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("invalid content identifier: {0}")]
    InvalidIdentifier(String),

    #[error("blocklist item not found: {0}")]
    NotFound(String),

    #[error("unexpected action type: '{0}'")]
    InvalidActionType(String),

    #[error("action does not reference any content identifier")]
    EmptyAction,

    #[error("datastore error: {0}")]
    Datastore(#[from] StoreError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlocklistError {
    /// True for failures of the underlying store rather than of the request.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Datastore(_) | Self::Database(_) | Self::Serialization(_)
        )
    }
}
