//! Notice type entity.
//!
//! Catalog entry for one class of notification. Registered once at startup
//! by collaborating applications and rarely mutated afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notice_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique identifier used by senders, e.g. `"comment_posted"`.
    #[sea_orm(unique)]
    pub label: String,

    /// Human-readable name.
    pub display: String,

    pub description: String,

    /// A medium delivers this type by default when its own spam
    /// sensitivity is less than or equal to this value.
    pub default_sensitivity: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notice::Entity")]
    Notice,

    #[sea_orm(has_many = "super::notice_setting::Entity")]
    NoticeSetting,

    #[sea_orm(has_many = "super::observation::Entity")]
    Observation,
}

impl ActiveModelBehavior for ActiveModel {}
