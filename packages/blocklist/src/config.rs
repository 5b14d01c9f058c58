use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Which blocklist backend to construct.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Relational,
    KeyValue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelationalConfig {
    /// Full connection URL. When set, the individual fields below are ignored.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Table holding blocklist entries. Audit entries always go to `auditlog`.
    pub table: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub sql_logging: bool,
}

impl RelationalConfig {
    /// Postgres URL for these settings.
    ///
    /// TLS is required except against the `postgres` host of the local
    /// compose setup.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let sslmode = if self.host == "postgres" {
            "disable"
        } else {
            "require"
        };
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.dbname, sslmode
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentStoreConfig {
    /// Directory of the content datastore. The key-value backend keeps its
    /// own namespaces in this store too.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlocklistConfig {
    pub backend: BackendKind,
    pub relational: RelationalConfig,
    pub content_store: ContentStoreConfig,
}

impl BlocklistConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Self::defaults()?
            // Load from config/blocklist.toml
            .add_source(File::with_name("config/blocklist").required(false))
            // Override from environment (e.g., BLOCKLIST__RELATIONAL__PASSWORD)
            .add_source(Environment::with_prefix("BLOCKLIST").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("backend", "keyvalue")?
            .set_default("relational.host", "localhost")?
            .set_default("relational.port", 5432)?
            .set_default("relational.user", "postgres")?
            .set_default("relational.password", "")?
            .set_default("relational.dbname", "postgres")?
            .set_default("relational.table", "blocklist")?
            .set_default("relational.max_connections", 10)?
            .set_default("relational.connect_timeout_secs", 8)?
            .set_default("relational.sql_logging", false)?
            .set_default("content_store.path", "./data/content")
    }
}
