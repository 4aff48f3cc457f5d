//! User entity.
//!
//! Minimal recipient record: enough identity for delivery (email address,
//! preferred notification language) and the viewer-permission flag.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Delivery address for the email backend. NULL disables email delivery.
    #[sea_orm(nullable)]
    pub email: Option<String>,

    /// Preferred notification language, NULL = use the process default.
    #[sea_orm(nullable)]
    pub language: Option<String>,

    /// Inactive users are excluded from broadcasts.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Admins may act on other users' notices.
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

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
