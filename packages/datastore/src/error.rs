use thiserror::Error;

/// Errors that can occur during datastore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("datastore IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be represented by this store.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
