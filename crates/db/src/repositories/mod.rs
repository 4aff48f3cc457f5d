//! Database repositories.

#![allow(missing_docs)]

pub mod notice;
pub mod notice_queue_batch;
pub mod notice_setting;
pub mod notice_type;
pub mod observation;
pub mod user;

pub use notice::NoticeRepository;
pub use notice_queue_batch::NoticeQueueBatchRepository;
pub use notice_setting::NoticeSettingRepository;
pub use notice_type::NoticeTypeRepository;
pub use observation::ObservationRepository;
pub use user::UserRepository;
