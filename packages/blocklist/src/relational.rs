use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use cid::Cid;
use datastore::Datastore;
use sea_orm::sea_query::{Alias, ColumnDef, Expr, ExprTrait, Index, Query, Table};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    QueryOrder, QuerySelect, Schema, Set, SqlErr,
};

use crate::config::RelationalConfig;
use crate::database;
use crate::entity::audit_log;
use crate::error::BlocklistError;
use crate::key::{ContentKey, parse_cid};
use crate::model::{Action, BlockData, BlocklistItem};
use crate::traits::{AuditObserver, Blocklist, TracingObserver};

const CONTENT_SEPARATOR: &str = "\n";
const IDS_SEPARATOR: &str = ";";

/// A live row of the blocklist table.
#[derive(Debug, FromQueryResult)]
struct BlocklistRow {
    hash: String,
    content: String,
    reason: String,
    user: String,
}

impl From<BlocklistRow> for BlocklistItem {
    fn from(row: BlocklistRow) -> Self {
        let content = if row.content.is_empty() {
            Vec::new()
        } else {
            row.content
                .split(CONTENT_SEPARATOR)
                .map(str::to_string)
                .collect()
        };
        Self {
            hash: row.hash,
            content,
            reason: row.reason,
            user: row.user,
        }
    }
}

impl TryFrom<audit_log::Model> for Action {
    type Error = BlocklistError;

    fn try_from(row: audit_log::Model) -> Result<Self, Self::Error> {
        if row.ids.is_empty() {
            return Err(BlocklistError::EmptyAction);
        }
        // Every segment must parse, including empty ones from stray separators.
        let ids = row
            .ids
            .split(IDS_SEPARATOR)
            .map(parse_cid)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            typ: row.typ.parse()?,
            ids,
            reason: row.reason,
            user: row.user,
            created_at: row.created_at,
        })
    }
}

/// Blocklist kept in a relational database.
///
/// Entries go to a configurable table whose rows carry a `deleted_at`
/// soft-delete marker; only rows with `deleted_at IS NULL` count as blocked.
/// Audit actions go to the `auditlog` table.
pub struct RelationalBlocklist {
    db: DatabaseConnection,
    table: String,
    datastore: Arc<dyn Datastore>,
    observer: Arc<dyn AuditObserver>,
}

impl RelationalBlocklist {
    /// Open a pool for `config` and make sure both tables exist.
    pub async fn connect(
        config: &RelationalConfig,
        datastore: Arc<dyn Datastore>,
    ) -> Result<Self, BlocklistError> {
        let db = database::init_db(config).await?;
        let blocklist = Self::new(db, config.table.clone(), datastore);
        blocklist.ensure_schema().await?;
        Ok(blocklist)
    }

    pub fn new(
        db: DatabaseConnection,
        table: impl Into<String>,
        datastore: Arc<dyn Datastore>,
    ) -> Self {
        Self {
            db,
            table: table.into(),
            datastore,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the sink that receives every logged action.
    pub fn with_observer(mut self, observer: Arc<dyn AuditObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The underlying database connection for direct queries.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn table(&self) -> Alias {
        Alias::new(self.table.as_str())
    }

    /// Create the blocklist and audit tables and their indexes if missing.
    ///
    /// The unique index on `hash` is what keeps concurrent `block` calls
    /// from inserting the same content twice.
    pub async fn ensure_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();

        let blocklist = Table::create()
            .table(self.table())
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("id"))
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new("created_at")).timestamp_with_time_zone().not_null())
            .col(ColumnDef::new(Alias::new("updated_at")).timestamp_with_time_zone().not_null())
            .col(ColumnDef::new(Alias::new("deleted_at")).timestamp_with_time_zone().null())
            .col(ColumnDef::new(Alias::new("hash")).string_len(100).not_null())
            .col(ColumnDef::new(Alias::new("content")).text().not_null())
            .col(ColumnDef::new(Alias::new("reason")).text().not_null())
            .col(ColumnDef::new(Alias::new("user")).string_len(100).not_null())
            .to_owned();
        self.db.execute_raw(backend.build(&blocklist)).await?;

        let hash_index = Index::create()
            .if_not_exists()
            .name(format!("idx_{}_hash", self.table))
            .table(self.table())
            .col(Alias::new("hash"))
            .unique()
            .to_owned();
        self.db.execute_raw(backend.build(&hash_index)).await?;

        let mut audit = Schema::new(backend).create_table_from_entity(audit_log::Entity);
        audit.if_not_exists();
        self.db.execute_raw(backend.build(&audit)).await?;

        let audit_index = Index::create()
            .if_not_exists()
            .name("idx_auditlog_created_at")
            .table(audit_log::Entity)
            .col(audit_log::Column::CreatedAt)
            .to_owned();
        self.db.execute_raw(backend.build(&audit_index)).await?;

        Ok(())
    }

    /// Hard-delete soft-deleted rows for `key` so they can't collide with a
    /// new entry on the unique index.
    async fn clear_tombstones(&self, key: &ContentKey) -> Result<(), DbErr> {
        let stmt = Query::delete()
            .from_table(self.table())
            .and_where(Expr::col(Alias::new("hash")).eq(key.to_string()))
            .and_where(Expr::col(Alias::new("deleted_at")).is_not_null())
            .to_owned();
        let backend = self.db.get_database_backend();
        let result = self.db.execute_raw(backend.build(&stmt)).await?;
        if result.rows_affected() > 0 {
            tracing::warn!(
                hash = %key,
                rows = result.rows_affected(),
                "Removed soft-deleted blocklist rows"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Blocklist for RelationalBlocklist {
    async fn contains(&self, id: &Cid) -> Result<bool, BlocklistError> {
        let key = ContentKey::from(id);
        let stmt = Query::select()
            .column(Alias::new("hash"))
            .from(self.table())
            .and_where(Expr::col(Alias::new("hash")).eq(key.to_string()))
            .and_where(Expr::col(Alias::new("deleted_at")).is_null())
            .limit(1)
            .to_owned();
        let backend = self.db.get_database_backend();
        let row = self.db.query_one_raw(backend.build(&stmt)).await?;
        Ok(row.is_some())
    }

    async fn block(&self, id: &Cid, data: &BlockData) -> Result<bool, BlocklistError> {
        let key = ContentKey::from(id);
        self.clear_tombstones(&key).await?;

        let now = Utc::now();
        let stmt = Query::insert()
            .into_table(self.table())
            .columns([
                Alias::new("created_at"),
                Alias::new("updated_at"),
                Alias::new("hash"),
                Alias::new("content"),
                Alias::new("reason"),
                Alias::new("user"),
            ])
            .values_panic([
                now.into(),
                now.into(),
                key.to_string().into(),
                data.content.join(CONTENT_SEPARATOR).into(),
                data.reason.clone().into(),
                data.user.clone().into(),
            ])
            .to_owned();

        let backend = self.db.get_database_backend();
        match self.db.execute_raw(backend.build(&stmt)).await {
            Ok(_) => {
                tracing::debug!(hash = %key, user = %data.user, "Blocked content");
                Ok(true)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(hash = %key, "Content already blocked");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn unblock(&self, id: &Cid) -> Result<(), BlocklistError> {
        let key = ContentKey::from(id);
        // A permanent delete, never a soft delete: a later block of the same
        // content must not find a leftover row.
        let stmt = Query::delete()
            .from_table(self.table())
            .and_where(Expr::col(Alias::new("hash")).eq(key.to_string()))
            .and_where(Expr::col(Alias::new("deleted_at")).is_null())
            .to_owned();
        let backend = self.db.get_database_backend();
        let result = self.db.execute_raw(backend.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Err(BlocklistError::NotFound(key.to_string()));
        }
        tracing::debug!(hash = %key, "Unblocked content");
        Ok(())
    }

    async fn search(&self, id: &Cid) -> Result<BlocklistItem, BlocklistError> {
        let key = ContentKey::from(id);
        let stmt = Query::select()
            .columns([
                Alias::new("hash"),
                Alias::new("content"),
                Alias::new("reason"),
                Alias::new("user"),
            ])
            .from(self.table())
            .and_where(Expr::col(Alias::new("hash")).eq(key.to_string()))
            .and_where(Expr::col(Alias::new("deleted_at")).is_null())
            .limit(1)
            .to_owned();
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one_raw(backend.build(&stmt))
            .await?
            .ok_or_else(|| BlocklistError::NotFound(key.to_string()))?;
        let row = BlocklistRow::from_query_result(&row, "")?;
        Ok(row.into())
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

        let ids: Vec<String> = action.ids.iter().map(Cid::to_string).collect();
        let model = audit_log::ActiveModel {
            typ: Set(action.typ.to_string()),
            ids: Set(ids.join(IDS_SEPARATOR)),
            reason: Set(action.reason.clone()),
            user: Set(action.user.clone()),
            created_at: Set(action.created_at.trunc_subsecs(6)),
            ..Default::default()
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn get_logs(&self, limit: usize) -> Result<Vec<Action>, BlocklistError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_asc(audit_log::Column::Typ)
            .order_by_desc(audit_log::Column::Id)
            .limit(limit as u64)
            .all(&self.db)
            .await?;

        rows.into_iter().map(Action::try_from).collect()
    }
}
