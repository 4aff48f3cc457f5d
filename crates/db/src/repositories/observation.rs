//! Observation repository.

use std::sync::Arc;

use crate::entities::{Observation, observation};
use noticekit_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Observation repository for database operations.
#[derive(Clone)]
pub struct ObservationRepository {
    db: Arc<DatabaseConnection>,
}

impl ObservationRepository {
    /// Create a new observation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an observation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<observation::Model>> {
        Observation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new observation.
    pub async fn create(&self, model: observation::ActiveModel) -> AppResult<observation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All subscription edges for an observed entity and notice type,
    /// newest first.
    pub async fn observers(
        &self,
        observed_kind: &str,
        observed_id: &str,
        notice_type_id: &str,
    ) -> AppResult<Vec<observation::Model>> {
        Observation::find()
            .filter(observation::Column::ObservedKind.eq(observed_kind))
            .filter(observation::Column::ObservedId.eq(observed_id))
            .filter(observation::Column::NoticeTypeId.eq(notice_type_id))
            .order_by_desc(observation::Column::Added)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Edges between one observer and one observed entity for a notice
    /// type. Duplicates are tolerated, hence the Vec.
    pub async fn get_for(
        &self,
        observed_kind: &str,
        observed_id: &str,
        observer_id: &str,
        notice_type_id: &str,
    ) -> AppResult<Vec<observation::Model>> {
        Observation::find()
            .filter(observation::Column::ObservedKind.eq(observed_kind))
            .filter(observation::Column::ObservedId.eq(observed_id))
            .filter(observation::Column::UserId.eq(observer_id))
            .filter(observation::Column::NoticeTypeId.eq(notice_type_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Everything an observer follows of one entity kind under any of the
    /// given notice types.
    pub async fn find_by_user_and_kind(
        &self,
        observer_id: &str,
        observed_kind: &str,
        notice_type_ids: &[String],
    ) -> AppResult<Vec<observation::Model>> {
        if notice_type_ids.is_empty() {
            return Ok(Vec::new());
        }
        Observation::find()
            .filter(observation::Column::UserId.eq(observer_id))
            .filter(observation::Column::ObservedKind.eq(observed_kind))
            .filter(
                observation::Column::NoticeTypeId
                    .is_in(notice_type_ids.iter().map(String::as_str)),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Entity kinds that have ever been observed.
    pub async fn distinct_observed_kinds(&self) -> AppResult<Vec<String>> {
        Observation::find()
            .select_only()
            .column(observation::Column::ObservedKind)
            .distinct()
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every observation referencing an entity.
    ///
    /// Returns the number of rows removed.
    pub async fn delete_for_entity(&self, observed_kind: &str, observed_id: &str) -> AppResult<u64> {
        use sea_orm::DeleteResult;

        let result: DeleteResult = Observation::delete_many()
            .filter(observation::Column::ObservedKind.eq(observed_kind))
            .filter(observation::Column::ObservedId.eq(observed_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete an observation by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Observation::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update the send flag on an observation.
    pub async fn set_send(
        &self,
        observation: observation::Model,
        send: bool,
    ) -> AppResult<observation::Model> {
        let mut active: observation::ActiveModel = observation.into();
        active.send = Set(send);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_observation(id: &str, user_id: &str, observed_id: &str) -> observation::Model {
        observation::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            notice_type_id: "nt1".to_string(),
            observed_kind: "blog_entry".to_string(),
            observed_id: observed_id.to_string(),
            send: true,
            added: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_observers_lists_edges() {
        let o1 = create_test_observation("o1", "user1", "entry1");
        let o2 = create_test_observation("o2", "user2", "entry1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[o1, o2]])
                .into_connection(),
        );

        let repo = ObservationRepository::new(db);
        let result = repo.observers("blog_entry", "entry1", "nt1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].user_id, "user1");
    }

    #[tokio::test]
    async fn test_delete_for_entity() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = ObservationRepository::new(db);
        let removed = repo.delete_for_entity("blog_entry", "entry1").await.unwrap();

        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_find_by_user_and_kind_empty_types() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = ObservationRepository::new(db);
        let result = repo
            .find_by_user_and_kind("user1", "blog_entry", &[])
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
