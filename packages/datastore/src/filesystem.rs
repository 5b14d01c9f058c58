use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StoreError;
use super::key::Key;
use super::traits::{Datastore, Entry, Order, Query};

const VALUE_SUFFIX: &str = ".data";
const TMP_DIR: &str = ".tmp";

/// Filesystem-backed datastore.
///
/// Each key maps to one file: `/a/b/c` is stored at `{base_path}/a/b/c.data`.
/// Writes land in `{base_path}/.tmp` first and are moved into place, so a
/// reader never observes a partially written value.
pub struct FilesystemDatastore {
    base_path: PathBuf,
}

impl FilesystemDatastore {
    /// Open (creating if needed) a datastore rooted at `base_path`.
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TMP_DIR)).await?;
        Ok(Self { base_path })
    }

    fn dir_path(&self, key: &Key) -> PathBuf {
        key.segments()
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    /// Compute the file path holding the value for `key`.
    fn value_path(&self, key: &Key) -> Result<PathBuf, StoreError> {
        if key.is_root() {
            return Err(StoreError::InvalidKey("the root key cannot hold a value".into()));
        }
        let parent = self.dir_path(&key.parent());
        Ok(parent.join(format!("{}{VALUE_SUFFIX}", key.name())))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_temp(&self, value: &[u8]) -> Result<PathBuf, StoreError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, value).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(temp_path)
    }
}

#[async_trait]
impl Datastore for FilesystemDatastore {
    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.value_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, key: &Key) -> Result<bool, StoreError> {
        let path = self.value_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn put(&self, key: &Key, value: &[u8]) -> Result<(), StoreError> {
        let path = self.value_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = self.write_temp(value).await?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn put_if_absent(&self, key: &Key, value: &[u8]) -> Result<bool, StoreError> {
        let path = self.value_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = self.write_temp(value).await?;

        // hard_link refuses to replace an existing file, which makes the
        // existence check and the write a single step.
        let linked = fs::hard_link(&temp_path, &path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &Key) -> Result<bool, StoreError> {
        let path = self.value_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn query(&self, query: Query) -> Result<Vec<Entry>, StoreError> {
        let mut pending = vec![query.prefix.clone()];
        let mut keys = Vec::new();

        while let Some(dir_key) = pending.pop() {
            let mut dir = match fs::read_dir(self.dir_path(&dir_key)).await {
                Ok(dir) => dir,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(item) = dir.next_entry().await? {
                let file_name = item.file_name();
                let Some(name) = file_name.to_str() else {
                    tracing::warn!("Skipping non UTF-8 datastore entry {:?}", item.path());
                    continue;
                };
                if dir_key.is_root() && name == TMP_DIR {
                    continue;
                }

                if item.file_type().await?.is_dir() {
                    pending.push(dir_key.child(name));
                } else if let Some(stem) = name.strip_suffix(VALUE_SUFFIX) {
                    keys.push(dir_key.child(stem));
                }
            }
        }

        keys.sort();
        if query.order == Order::Descending {
            keys.reverse();
        }
        if let Some(limit) = query.limit {
            keys.truncate(limit);
        }

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            // A concurrent delete may have removed the file since the scan.
            if let Some(value) = self.get(&key).await? {
                entries.push(Entry { key, value });
            }
        }
        Ok(entries)
    }
}
