//! Notice setting repository.

use std::sync::Arc;

use crate::entities::{NoticeSetting, notice_setting};
use chrono::Utc;
use noticekit_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

/// Notice setting repository for database operations.
#[derive(Clone)]
pub struct NoticeSettingRepository {
    db: Arc<DatabaseConnection>,
}

impl NoticeSettingRepository {
    /// Create a new notice setting repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the setting row for a (user, notice type, medium) triple.
    pub async fn find(
        &self,
        user_id: &str,
        notice_type_id: &str,
        medium_id: i16,
    ) -> AppResult<Option<notice_setting::Model>> {
        NoticeSetting::find()
            .filter(notice_setting::Column::UserId.eq(user_id))
            .filter(notice_setting::Column::NoticeTypeId.eq(notice_type_id))
            .filter(notice_setting::Column::MediumId.eq(medium_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the setting row, creating it with the given default when absent.
    ///
    /// Concurrent first access for the same triple is resolved by the
    /// unique index: a losing insert refetches the winner's row.
    pub async fn get_or_create(
        &self,
        new_id: &str,
        user_id: &str,
        notice_type_id: &str,
        medium_id: i16,
        default_send: bool,
    ) -> AppResult<notice_setting::Model> {
        if let Some(existing) = self.find(user_id, notice_type_id, medium_id).await? {
            return Ok(existing);
        }

        let active = notice_setting::ActiveModel {
            id: Set(new_id.to_string()),
            user_id: Set(user_id.to_string()),
            notice_type_id: Set(notice_type_id.to_string()),
            medium_id: Set(medium_id),
            send: Set(default_send),
            created_at: Set(Utc::now().into()),
        };

        match active.insert(self.db.as_ref()).await {
            Ok(created) => Ok(created),
            Err(insert_err) => {
                // Unique violation means another writer won the race.
                match self.find(user_id, notice_type_id, medium_id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(AppError::Database(insert_err.to_string())),
                }
            }
        }
    }

    /// Update the send flag on an existing row.
    pub async fn set_send(
        &self,
        setting: notice_setting::Model,
        send: bool,
    ) -> AppResult<notice_setting::Model> {
        let mut active: notice_setting::ActiveModel = setting.into();
        active.send = Set(send);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Force `send = false` on every setting for a user and medium.
    ///
    /// Returns the number of rows changed.
    pub async fn disable_all_for_medium(&self, user_id: &str, medium_id: i16) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        let result: UpdateResult = NoticeSetting::update_many()
            .filter(notice_setting::Column::UserId.eq(user_id))
            .filter(notice_setting::Column::MediumId.eq(medium_id))
            .filter(notice_setting::Column::Send.eq(true))
            .col_expr(notice_setting::Column::Send, false.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// All settings for a user, for the preference grid.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<notice_setting::Model>> {
        NoticeSetting::find()
            .filter(notice_setting::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_setting(id: &str, user_id: &str, medium_id: i16, send: bool) -> notice_setting::Model {
        notice_setting::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            notice_type_id: "nt1".to_string(),
            medium_id,
            send,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing() {
        let setting = create_test_setting("ns1", "user1", 0, true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[setting.clone()]])
                .into_connection(),
        );

        let repo = NoticeSettingRepository::new(db);
        let result = repo
            .get_or_create("new-id", "user1", "nt1", 0, false)
            .await
            .unwrap();

        // Existing row wins over the computed default.
        assert_eq!(result.id, "ns1");
        assert!(result.send);
    }

    #[tokio::test]
    async fn test_get_or_create_inserts_default() {
        let created = create_test_setting("ns2", "user1", 1, false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notice_setting::Model>::new()])
                .append_query_results([[created.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = NoticeSettingRepository::new(db);
        let result = repo
            .get_or_create("ns2", "user1", "nt1", 1, false)
            .await
            .unwrap();

        assert_eq!(result.id, "ns2");
        assert!(!result.send);
    }

    #[tokio::test]
    async fn test_get_or_create_refetches_after_losing_insert_race() {
        use sea_orm::{DbErr, RuntimeErr};

        // Another writer creates the row between our find and insert;
        // the unique violation resolves to the winner's row.
        let winner = create_test_setting("ns1", "user1", 0, true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notice_setting::Model>::new()])
                .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                    "duplicate key value violates unique constraint".to_string(),
                ))])
                .append_query_results([[winner.clone()]])
                .into_connection(),
        );

        let repo = NoticeSettingRepository::new(db);
        let result = repo
            .get_or_create("loser-id", "user1", "nt1", 0, false)
            .await
            .unwrap();

        assert_eq!(result.id, "ns1");
        assert!(result.send);
    }

    #[tokio::test]
    async fn test_disable_all_for_medium() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = NoticeSettingRepository::new(db);
        let changed = repo.disable_all_for_medium("user1", 1).await.unwrap();

        assert_eq!(changed, 3);
    }
}
