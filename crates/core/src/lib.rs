//! Core notification services for noticekit.
//!
//! Everything above the repositories lives here: the backend registry,
//! the delivery backends themselves, per-user preference resolution,
//! the dispatcher that fans a notice out to backends, the observation
//! registry, and the viewer-facing notice operations.

pub mod services;

pub use services::backends::{
    BackendFactories, BackendRegistry, NoticeBackend, StoreReceipt,
};
pub use services::dispatcher::{
    Dispatcher, QUEUE_FORMAT_VERSION, QueuedBatch, Recipients, SendOptions, SendOutcome,
};
pub use services::email::EmailBackend;
pub use services::entity::{DeletedEntity, EntityRef};
pub use services::language::{LanguageStore, ProfileLanguageStore};
pub use services::mailer::{Mailer, NoOpMailer, OutboundMessage, SmtpMailer};
pub use services::notice_type::NoticeTypeService;
pub use services::notices::{Actor, BulkAction, NoticeService};
pub use services::observation::ObservationService;
pub use services::preferences::PreferenceService;
pub use services::routing::{KindRouteResolver, OpenRouteResolver, RouteResolver};
pub use services::templates::{NoticeContext, TemplateStore};
pub use services::website::WebsiteBackend;
