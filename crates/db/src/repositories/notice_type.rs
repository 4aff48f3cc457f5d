//! Notice type repository.

use std::sync::Arc;

use crate::entities::{NoticeType, notice_type};
use noticekit_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Notice type repository for database operations.
#[derive(Clone)]
pub struct NoticeTypeRepository {
    db: Arc<DatabaseConnection>,
}

impl NoticeTypeRepository {
    /// Create a new notice type repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notice type by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notice_type::Model>> {
        NoticeType::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a notice type by ID, failing when absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<notice_type::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NoticeTypeNotFound(id.to_string()))
    }

    /// Find a notice type by label.
    pub async fn find_by_label(&self, label: &str) -> AppResult<Option<notice_type::Model>> {
        NoticeType::find()
            .filter(notice_type::Column::Label.eq(label))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a notice type by label, failing when absent.
    pub async fn get_by_label(&self, label: &str) -> AppResult<notice_type::Model> {
        self.find_by_label(label)
            .await?
            .ok_or_else(|| AppError::NoticeTypeNotFound(label.to_string()))
    }

    /// Find notice types matching any of the given labels.
    pub async fn find_by_labels(&self, labels: &[String]) -> AppResult<Vec<notice_type::Model>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        NoticeType::find()
            .filter(notice_type::Column::Label.is_in(labels.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all notice types.
    pub async fn all(&self) -> AppResult<Vec<notice_type::Model>> {
        NoticeType::find()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notice type.
    pub async fn create(&self, model: notice_type::ActiveModel) -> AppResult<notice_type::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing notice type.
    pub async fn update(&self, model: notice_type::ActiveModel) -> AppResult<notice_type::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
