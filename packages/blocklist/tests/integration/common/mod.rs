use std::sync::Arc;

use blocklist::entity::audit_log;
use blocklist::key::DAG_PB;
use blocklist::{BlockData, Blocklist, BlocklistConfig, DatastoreBlocklist, RelationalBlocklist};
use chrono::{TimeZone, Utc};
use cid::Cid;
use datastore::{Datastore, Key};
use datastore::filesystem::FilesystemDatastore;
use datastore::memory::MemoryDatastore;
use multihash::Multihash;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Multicodec code for sha2-256.
const SHA2_256: u64 = 0x12;

/// CIDv0 and dag-pb CIDv1 over the sha2-256 of `data`.
pub fn cid_pair(data: &[u8]) -> (Cid, Cid) {
    let digest = Sha256::digest(data);
    let hash = Multihash::<64>::wrap(SHA2_256, &digest).expect("digest fits");
    let v0 = Cid::new_v0(hash).expect("sha2-256 is a valid v0 hash");
    let v1 = Cid::new_v1(DAG_PB, hash);
    (v0, v1)
}

pub fn block_data(user: &str, reason: &str) -> BlockData {
    BlockData {
        content: vec![format!("https://gateway.example/ipfs/{user}")],
        reason: reason.to_string(),
        user: user.to_string(),
    }
}

/// A blocklist backend plus the content store its `purge` deletes from.
pub struct Fixture {
    pub blocklist: Arc<dyn Blocklist>,
    pub content: Arc<dyn Datastore>,
    /// Set for the relational backend.
    db: Option<DatabaseConnection>,
    _dir: Option<TempDir>,
}

impl Fixture {
    pub async fn memory() -> Self {
        let content: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        Self {
            blocklist: Arc::new(DatastoreBlocklist::new(content.clone())),
            content,
            db: None,
            _dir: None,
        }
    }

    pub async fn filesystem() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let content: Arc<dyn Datastore> = Arc::new(
            FilesystemDatastore::new(dir.path().join("datastore"))
                .await
                .unwrap(),
        );
        Self {
            blocklist: Arc::new(DatastoreBlocklist::new(content.clone())),
            content,
            db: None,
            _dir: Some(dir),
        }
    }

    pub async fn sqlite() -> Self {
        let content: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());
        let blocklist = sqlite_blocklist(content.clone()).await;
        Self {
            db: Some(blocklist.db().clone()),
            blocklist: Arc::new(blocklist),
            content,
            _dir: None,
        }
    }

    /// Store an audit entry whose type is neither `block` nor `unblock`,
    /// bypassing `add_log`, newer than anything the tests log.
    pub async fn seed_unknown_action_type(&self, id: &Cid) {
        let created_at = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        match &self.db {
            Some(db) => {
                audit_log::ActiveModel {
                    typ: Set("delete".into()),
                    ids: Set(id.to_string()),
                    reason: Set(String::new()),
                    user: Set("ops@example.com".into()),
                    created_at: Set(created_at),
                    ..Default::default()
                }
                .insert(db)
                .await
                .unwrap();
            }
            None => {
                let raw = format!(
                    r#"{{"Typ":"delete","Ids":[{{"/":"{id}"}}],"Reason":"","User":"ops@example.com","CreatedAt":"2099-01-01T00:00:00Z"}}"#
                );
                self.content
                    .put(&Key::new("/safemode/audit/2099-01-01T00:00:00Z"), raw.as_bytes())
                    .await
                    .unwrap();
            }
        }
    }
}

/// Relational backend over a private in-memory SQLite database.
///
/// Every pooled connection to `sqlite::memory:` opens its own database, so
/// the pool is pinned to a single connection.
pub async fn sqlite_blocklist(content: Arc<dyn Datastore>) -> RelationalBlocklist {
    let config = BlocklistConfig::from_toml(
        r#"
        backend = "relational"

        [relational]
        url = "sqlite::memory:"
        table = "compliance_blocklist"
        max_connections = 1
        "#,
    )
    .unwrap();
    RelationalBlocklist::connect(&config.relational, content)
        .await
        .expect("Failed to open SQLite blocklist")
}
