//! Notice queue batch repository.

use std::sync::Arc;

use crate::entities::{NoticeQueueBatch, notice_queue_batch};
use chrono::Utc;
use noticekit_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
    Set,
};

/// Notice queue batch repository for database operations.
#[derive(Clone)]
pub struct NoticeQueueBatchRepository {
    db: Arc<DatabaseConnection>,
}

impl NoticeQueueBatchRepository {
    /// Create a new notice queue batch repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a batch with the given payload.
    pub async fn create(
        &self,
        id: &str,
        payload: serde_json::Value,
    ) -> AppResult<notice_queue_batch::Model> {
        let active = notice_queue_batch::ActiveModel {
            id: Set(id.to_string()),
            payload: Set(payload),
            created_at: Set(Utc::now().into()),
        };
        active
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Oldest batches first, for FIFO replay.
    pub async fn oldest(&self, limit: u64) -> AppResult<Vec<notice_queue_batch::Model>> {
        NoticeQueueBatch::find()
            .order_by_asc(notice_queue_batch::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of pending batches.
    pub async fn count(&self) -> AppResult<u64> {
        NoticeQueueBatch::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a processed batch.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        NoticeQueueBatch::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_batch(id: &str) -> notice_queue_batch::Model {
        notice_queue_batch::Model {
            id: id.to_string(),
            payload: serde_json::json!({"version": 1, "user_ids": ["user1"]}),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_oldest_orders_fifo() {
        let b1 = create_test_batch("b1");
        let b2 = create_test_batch("b2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[b1, b2]])
                .into_connection(),
        );

        let repo = NoticeQueueBatchRepository::new(db);
        let result = repo.oldest(10).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "b1");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = NoticeQueueBatchRepository::new(db);
        let result = repo.delete("b1").await;

        assert!(result.is_ok());
    }
}
