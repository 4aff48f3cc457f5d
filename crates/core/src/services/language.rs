//! Per-user notification language lookup.

use noticekit_common::{AppError, AppResult};
use noticekit_db::entities::user;

/// Source of a user's preferred notification language.
pub trait LanguageStore: Send + Sync {
    /// The user's language, or [`AppError::LanguageUnavailable`] when
    /// none is recorded. The dispatcher treats that error as
    /// recoverable and falls back to the configured default.
    fn preferred_language(&self, user: &user::Model) -> AppResult<String>;
}

/// Language store reading the user profile's language column.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileLanguageStore;

impl LanguageStore for ProfileLanguageStore {
    fn preferred_language(&self, user: &user::Model) -> AppResult<String> {
        user.language
            .clone()
            .filter(|language| !language.is_empty())
            .ok_or_else(|| AppError::LanguageUnavailable(user.id.clone()))
    }
}
