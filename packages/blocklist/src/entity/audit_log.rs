use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per auditable action. Rows are only ever inserted.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auditlog")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// "block" or "unblock".
    pub typ: String,

    /// Affected CIDs, joined with `;`.
    #[sea_orm(column_type = "Text")]
    pub ids: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    pub user: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
