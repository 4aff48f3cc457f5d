//! Notice type catalog registration.

use noticekit_common::{AppResult, IdGenerator};
use noticekit_db::entities::notice_type;
use noticekit_db::repositories::NoticeTypeRepository;
use sea_orm::Set;

/// Service maintaining the notice type catalog.
///
/// Applications call [`register`](Self::register) at startup for each
/// notice type they emit. Registration is an upsert keyed by label, so
/// repeated startups converge instead of duplicating rows.
#[derive(Clone)]
pub struct NoticeTypeService {
    notice_types: NoticeTypeRepository,
    id_gen: IdGenerator,
}

impl NoticeTypeService {
    #[must_use]
    pub fn new(notice_types: NoticeTypeRepository) -> Self {
        Self {
            notice_types,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a notice type, updating display text and default
    /// sensitivity when they changed.
    pub async fn register(
        &self,
        label: &str,
        display: &str,
        description: &str,
        default_sensitivity: i32,
    ) -> AppResult<notice_type::Model> {
        if let Some(existing) = self.notice_types.find_by_label(label).await? {
            if existing.display == display
                && existing.description == description
                && existing.default_sensitivity == default_sensitivity
            {
                return Ok(existing);
            }
            let mut active: notice_type::ActiveModel = existing.into();
            active.display = Set(display.to_string());
            active.description = Set(description.to_string());
            active.default_sensitivity = Set(default_sensitivity);
            let updated = self.notice_types.update(active).await?;
            tracing::debug!(label, "updated notice type");
            return Ok(updated);
        }

        let active = notice_type::ActiveModel {
            id: Set(self.id_gen.generate()),
            label: Set(label.to_string()),
            display: Set(display.to_string()),
            description: Set(description.to_string()),
            default_sensitivity: Set(default_sensitivity),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.notice_types.create(active).await?;
        tracing::debug!(label, "created notice type");
        Ok(created)
    }

    /// All registered notice types.
    pub async fn all(&self) -> AppResult<Vec<notice_type::Model>> {
        self.notice_types.all().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_notice_type(default_sensitivity: i32) -> notice_type::Model {
        notice_type::Model {
            id: "nt1".to_string(),
            label: "comment_posted".to_string(),
            display: "Comment posted".to_string(),
            description: "someone commented".to_string(),
            default_sensitivity,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let existing = create_test_notice_type(2);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let service = NoticeTypeService::new(NoticeTypeRepository::new(db));
        let result = service
            .register("comment_posted", "Comment posted", "someone commented", 2)
            .await
            .unwrap();

        // Unchanged registration issues no write.
        assert_eq!(result.id, "nt1");
    }

    #[tokio::test]
    async fn test_register_updates_changed_default() {
        let existing = create_test_notice_type(2);
        let updated = create_test_notice_type(1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_query_results([[updated]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = NoticeTypeService::new(NoticeTypeRepository::new(db));
        let result = service
            .register("comment_posted", "Comment posted", "someone commented", 1)
            .await
            .unwrap();

        assert_eq!(result.default_sensitivity, 1);
    }
}
