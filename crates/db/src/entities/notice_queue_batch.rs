//! Notice queue batch entity.
//!
//! One deferred dispatch call, serialized for replay by the queue worker.
//! The payload format is internal: what this process wrote, this
//! process's worker can read. Rows are FIFO by id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notice_queue_batch")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Versioned batch payload.
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
