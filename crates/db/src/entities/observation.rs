//! Observation entity.
//!
//! A subscription edge between an observer user and an observed entity for
//! one notice type. The `send` flag mutes the edge without deleting it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "observation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The observer.
    pub user_id: String,

    pub notice_type_id: String,

    /// Observed entity kind, e.g. `"blog_entry"`.
    pub observed_kind: String,

    /// Observed entity id within its kind.
    pub observed_id: String,

    /// Per-subscription mute: false suppresses notices without
    /// removing the edge.
    #[sea_orm(default_value = true)]
    pub send: bool,

    pub added: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::notice_type::Entity",
        from = "Column::NoticeTypeId",
        to = "super::notice_type::Column::Id",
        on_delete = "Cascade"
    )]
    NoticeType,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::notice_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoticeType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
