//! Database entities.

#![allow(missing_docs)]

pub mod notice;
pub mod notice_queue_batch;
pub mod notice_setting;
pub mod notice_type;
pub mod observation;
pub mod user;

pub use notice::Entity as Notice;
pub use notice_queue_batch::Entity as NoticeQueueBatch;
pub use notice_setting::Entity as NoticeSetting;
pub use notice_type::Entity as NoticeType;
pub use observation::Entity as Observation;
pub use user::Entity as User;
