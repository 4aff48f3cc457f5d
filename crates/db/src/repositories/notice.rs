//! Notice repository.

use std::sync::Arc;

use crate::entities::{Notice, notice};
use noticekit_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

/// Notice repository for database operations.
#[derive(Clone)]
pub struct NoticeRepository {
    db: Arc<DatabaseConnection>,
}

impl NoticeRepository {
    /// Create a new notice repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notice by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notice::Model>> {
        Notice::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a notice by ID, failing when absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<notice::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notice {id}")))
    }

    /// Create a new notice.
    pub async fn create(&self, model: notice::ActiveModel) -> AppResult<notice::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notices for a user, newest first.
    ///
    /// `archived = false` restricts to non-archived rows; `unseen = None`
    /// returns both seen and unseen.
    pub async fn notices_for(
        &self,
        user_id: &str,
        archived: bool,
        unseen: Option<bool>,
    ) -> AppResult<Vec<notice::Model>> {
        let mut query = Notice::find()
            .filter(notice::Column::RecipientId.eq(user_id))
            .order_by_desc(notice::Column::Added);

        if !archived {
            query = query.filter(notice::Column::Archived.eq(false));
        }
        if let Some(unseen) = unseen {
            query = query.filter(notice::Column::Unseen.eq(unseen));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unseen, non-archived notices for a user.
    pub async fn unseen_count(&self, user_id: &str) -> AppResult<u64> {
        Notice::find()
            .filter(notice::Column::RecipientId.eq(user_id))
            .filter(notice::Column::Archived.eq(false))
            .filter(notice::Column::Unseen.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark all unseen notices for a user as seen.
    pub async fn mark_all_seen(&self, user_id: &str) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        let result: UpdateResult = Notice::update_many()
            .filter(notice::Column::RecipientId.eq(user_id))
            .filter(notice::Column::Unseen.eq(true))
            .col_expr(notice::Column::Unseen, false.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark every notice from one sender entity to a recipient as seen.
    ///
    /// Called when the recipient views the sender, so notices about it
    /// are no longer fresh.
    pub async fn mark_seen_for_sender(
        &self,
        sender_kind: &str,
        sender_id: &str,
        recipient_id: &str,
    ) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        let result: UpdateResult = Notice::update_many()
            .filter(notice::Column::SenderKind.eq(sender_kind))
            .filter(notice::Column::SenderId.eq(sender_id))
            .filter(notice::Column::RecipientId.eq(recipient_id))
            .filter(notice::Column::Unseen.eq(true))
            .col_expr(notice::Column::Unseen, false.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Update the unseen flag.
    pub async fn set_unseen(&self, notice: notice::Model, unseen: bool) -> AppResult<notice::Model> {
        let mut active: notice::ActiveModel = notice.into();
        active.unseen = Set(unseen);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update the archived flag.
    pub async fn set_archived(
        &self,
        notice: notice::Model,
        archived: bool,
    ) -> AppResult<notice::Model> {
        let mut active: notice::ActiveModel = notice.into();
        active.archived = Set(archived);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a notice.
    pub async fn delete(&self, notice: notice::Model) -> AppResult<()> {
        notice
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
