//! Queue workers.

pub mod emit;

pub use emit::{EmitNoticesWorker, WorkerConfig};
