//! Notice setting entity.
//!
//! Per-(user, notice type, medium) delivery flag. Rows are created lazily
//! on first resolution; the unique index makes concurrent first access
//! collapse to a single row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notice_setting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    pub notice_type_id: String,

    /// Position of the medium in the configured backend list.
    pub medium_id: i16,

    pub send: bool,

    pub created_at: DateTimeWithTimeZone,
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
