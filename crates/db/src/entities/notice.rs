//! Notice entity.
//!
//! Durable per-user record created by the website backend. The sender is a
//! tagged reference so any entity kind can originate a notification.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notice")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub recipient_id: String,

    pub notice_type_id: String,

    /// Sender entity kind, NULL for system notices.
    #[sea_orm(nullable)]
    pub sender_kind: Option<String>,

    /// Sender entity id within its kind.
    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    /// Context captured at send time.
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    /// Validated path to the sender entity, captured at send time.
    #[sea_orm(nullable)]
    pub sender_path: Option<String>,

    /// Flips to false exactly once, the first time the notice is viewed.
    #[sea_orm(default_value = true)]
    pub unseen: bool,

    #[sea_orm(default_value = false)]
    pub archived: bool,

    pub added: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,

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
        Relation::Recipient.def()
    }
}

impl Related<super::notice_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoticeType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
