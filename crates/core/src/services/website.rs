//! On-site notice backend.
//!
//! The store backend: persists a notice row per recipient and hands
//! the dispatcher a receipt so later backends can link to the stored
//! notice.

use async_trait::async_trait;
use chrono::Utc;
use noticekit_common::{AppResult, IdGenerator};
use noticekit_db::entities::{notice, notice_type, user};
use noticekit_db::repositories::NoticeRepository;
use sea_orm::Set;
use serde_json::Value;

use crate::services::backends::{NoticeBackend, StoreReceipt};
use crate::services::entity::EntityRef;
use crate::services::preferences::PreferenceService;
use crate::services::templates::NoticeContext;

/// Backend persisting notices for on-site display.
pub struct WebsiteBackend {
    medium_id: i16,
    label: String,
    spam_sensitivity: i32,
    preferences: PreferenceService,
    notices: NoticeRepository,
    id_gen: IdGenerator,
}

impl WebsiteBackend {
    /// On-site notices are the least intrusive medium.
    pub const SPAM_SENSITIVITY: i32 = 1;

    #[must_use]
    pub fn new(
        medium_id: i16,
        label: impl Into<String>,
        spam_sensitivity: Option<i32>,
        preferences: PreferenceService,
        notices: NoticeRepository,
    ) -> Self {
        Self {
            medium_id,
            label: label.into(),
            spam_sensitivity: spam_sensitivity.unwrap_or(Self::SPAM_SENSITIVITY),
            preferences,
            notices,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl NoticeBackend for WebsiteBackend {
    fn medium_id(&self) -> i16 {
        self.medium_id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn spam_sensitivity(&self) -> i32 {
        self.spam_sensitivity
    }

    fn is_store(&self) -> bool {
        true
    }

    async fn can_send(
        &self,
        user: &user::Model,
        notice_type: &notice_type::Model,
    ) -> AppResult<bool> {
        self.preferences
            .should_send(user, notice_type, self.medium_id, self.spam_sensitivity)
            .await
    }

    async fn deliver(
        &self,
        recipient: &user::Model,
        sender: Option<&EntityRef>,
        notice_type: &notice_type::Model,
        context: &NoticeContext,
    ) -> AppResult<Option<StoreReceipt>> {
        let sender_path = context
            .get("sender_path")
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .map(ToString::to_string);

        let active = notice::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient.id.clone()),
            notice_type_id: Set(notice_type.id.clone()),
            sender_kind: Set(sender.map(|s| s.kind.clone())),
            sender_id: Set(sender.map(|s| s.id.clone())),
            data: Set(Value::Object(context.clone())),
            sender_path: Set(sender_path),
            unseen: Set(true),
            archived: Set(false),
            added: Set(Utc::now().into()),
        };

        let created = self.notices.create(active).await?;
        tracing::debug!(
            notice_id = %created.id,
            recipient = %recipient.id,
            label = %notice_type.label,
            "stored notice"
        );

        let sender_url = format!("/notices/view/{}/", created.id);
        Ok(Some(StoreReceipt {
            notice_id: created.id,
            sender_url,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use noticekit_common::Signer;
    use noticekit_db::repositories::{NoticeSettingRepository, NoticeTypeRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    fn create_test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            email: None,
            language: None,
            is_active: true,
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_notice_type() -> notice_type::Model {
        notice_type::Model {
            id: "nt1".to_string(),
            label: "comment_posted".to_string(),
            display: "Comment posted".to_string(),
            description: "someone commented".to_string(),
            default_sensitivity: 2,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_notice(id: &str, sender_path: Option<&str>) -> notice::Model {
        notice::Model {
            id: id.to_string(),
            recipient_id: "user1".to_string(),
            notice_type_id: "nt1".to_string(),
            sender_kind: Some("comment".to_string()),
            sender_id: Some("7".to_string()),
            data: json!({}),
            sender_path: sender_path.map(ToString::to_string),
            unseen: true,
            archived: false,
            added: Utc::now().into(),
        }
    }

    fn backend(db: Arc<sea_orm::DatabaseConnection>) -> WebsiteBackend {
        let preferences = PreferenceService::new(
            NoticeSettingRepository::new(db.clone()),
            NoticeTypeRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            Signer::new("secret"),
            vec!["website".to_string()],
        );
        WebsiteBackend::new(0, "website", None, preferences, NoticeRepository::new(db))
    }

    #[tokio::test]
    async fn test_deliver_stores_notice_and_returns_receipt() {
        let stored = create_test_notice("n1", Some("/comment/7/"));
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let backend = backend(db);
        let mut context = NoticeContext::new();
        context.insert("sender_path".to_string(), json!("/comment/7/"));

        let receipt = backend
            .deliver(
                &create_test_user(),
                Some(&EntityRef::new("comment", "7")),
                &create_test_notice_type(),
                &context,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(receipt.notice_id, "n1");
        assert_eq!(receipt.sender_url, "/notices/view/n1/");
    }
}
