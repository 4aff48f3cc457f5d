//! Queued notice replay for noticekit.
//!
//! Deferred sends are appended to a database-backed FIFO queue; the
//! worker in this crate drains it on an interval and replays each
//! batch through the dispatcher.

pub mod workers;

pub use workers::{EmitNoticesWorker, WorkerConfig};
