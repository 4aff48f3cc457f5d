//! Common utilities and shared types for noticekit.
//!
//! This crate provides foundational components used across all noticekit crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Signing**: HMAC-signed tokens for unsubscribe links via [`Signer`]
//!
//! # Example
//!
//! ```no_run
//! use noticekit_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod signing;

pub use config::{
    BackendEntry, Config, DatabaseConfig, DispatchConfig, EmailConfig, ObservationConfig,
    SiteConfig,
};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use signing::Signer;
