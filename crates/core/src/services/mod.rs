//! Notification service layer.

pub mod backends;
pub mod dispatcher;
pub mod email;
pub mod entity;
pub mod language;
pub mod mailer;
pub mod notice_type;
pub mod notices;
pub mod observation;
pub mod preferences;
pub mod routing;
pub mod templates;
pub mod website;
