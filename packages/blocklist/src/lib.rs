//! Content blocklist for a content-addressed storage gateway.
//!
//! A gateway asks [`Blocklist::contains`] before serving or fetching a CID.
//! Two interchangeable backends implement the contract:
//! [`DatastoreBlocklist`] over a namespaced key-value store and
//! [`RelationalBlocklist`] over a SQL database.

pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod key;
pub mod keyvalue;
pub mod model;
pub mod relational;
pub mod traits;

use std::sync::Arc;

use datastore::Datastore;
use datastore::filesystem::FilesystemDatastore;

pub use config::{BackendKind, BlocklistConfig, RelationalConfig};
pub use error::BlocklistError;
pub use key::{ContentKey, parse_cid};
pub use keyvalue::DatastoreBlocklist;
pub use model::{Action, ActionType, BlockData, BlocklistItem};
pub use relational::RelationalBlocklist;
pub use traits::{AuditObserver, AuditedError, Blocklist, BlocklistExt, TracingObserver};

/// Build the backend selected by `config`.
pub async fn open(config: &BlocklistConfig) -> Result<Box<dyn Blocklist>, BlocklistError> {
    let content: Arc<dyn Datastore> =
        Arc::new(FilesystemDatastore::new(config.content_store.path.clone()).await?);

    match config.backend {
        BackendKind::KeyValue => {
            tracing::info!(path = %config.content_store.path.display(), "Using key-value blocklist");
            Ok(Box::new(DatastoreBlocklist::new(content)))
        }
        BackendKind::Relational => {
            tracing::info!(table = %config.relational.table, "Using relational blocklist");
            let blocklist = RelationalBlocklist::connect(&config.relational, content).await?;
            Ok(Box::new(blocklist))
        }
    }
}
