//! Email notice backend.
//!
//! Renders the short and full message bodies, wraps them in the email
//! subject and body templates, and hands the result to the configured
//! mail transport. Only users with a recorded email address are
//! eligible.

use std::sync::Arc;

use async_trait::async_trait;
use noticekit_common::{AppError, AppResult};
use noticekit_db::entities::{notice_type, user};
use serde_json::json;

use crate::services::backends::{NoticeBackend, StoreReceipt};
use crate::services::entity::EntityRef;
use crate::services::mailer::Mailer;
use crate::services::preferences::PreferenceService;
use crate::services::templates::{NoticeContext, TemplateStore};

/// Backend delivering notices by email.
pub struct EmailBackend {
    medium_id: i16,
    label: String,
    spam_sensitivity: i32,
    preferences: PreferenceService,
    templates: Arc<TemplateStore>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl EmailBackend {
    /// Email interrupts, so it is off by default for low-sensitivity
    /// notice types.
    pub const SPAM_SENSITIVITY: i32 = 2;

    #[must_use]
    pub fn new(
        medium_id: i16,
        label: impl Into<String>,
        spam_sensitivity: Option<i32>,
        preferences: PreferenceService,
        templates: Arc<TemplateStore>,
        mailer: Arc<dyn Mailer>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            medium_id,
            label: label.into(),
            spam_sensitivity: spam_sensitivity.unwrap_or(Self::SPAM_SENSITIVITY),
            preferences,
            templates,
            mailer,
            from_address: from_address.into(),
        }
    }
}

fn usable_email(user: &user::Model) -> Option<&str> {
    user.email.as_deref().filter(|email| !email.is_empty())
}

#[async_trait]
impl NoticeBackend for EmailBackend {
    fn medium_id(&self) -> i16 {
        self.medium_id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn spam_sensitivity(&self) -> i32 {
        self.spam_sensitivity
    }

    async fn can_send(
        &self,
        user: &user::Model,
        notice_type: &notice_type::Model,
    ) -> AppResult<bool> {
        if usable_email(user).is_none() {
            return Ok(false);
        }
        self.preferences
            .should_send(user, notice_type, self.medium_id, self.spam_sensitivity)
            .await
    }

    async fn deliver(
        &self,
        recipient: &user::Model,
        _sender: Option<&EntityRef>,
        notice_type: &notice_type::Model,
        context: &NoticeContext,
    ) -> AppResult<Option<StoreReceipt>> {
        let email = usable_email(recipient).ok_or_else(|| {
            AppError::BadRequest(format!("user {} has no email address", recipient.id))
        })?;
        let label = &notice_type.label;

        let short = self
            .templates
            .format_notification("short.txt", label, context)?
            .trim_end()
            .to_string();
        let full_text = self.templates.format_notification("full.txt", label, context)?;
        let full_html = self.templates.format_notification("full.html", label, context)?;

        let mut subject_context = context.clone();
        subject_context.insert("message".to_string(), json!(short));
        let subject = self
            .templates
            .format_notification("email_subject.txt", label, &subject_context)?
            .trim_end()
            .to_string();

        let mut body_context = context.clone();
        body_context.insert("message".to_string(), json!(full_text));
        let text_body = self
            .templates
            .format_notification("email_body.txt", label, &body_context)?;

        body_context.insert("message".to_string(), json!(full_html));
        let html_body = self
            .templates
            .format_notification("email_body.html", label, &body_context)?;

        self.mailer
            .send_message(
                &subject,
                &text_body,
                Some(&html_body),
                &self.from_address,
                &[email.to_string()],
            )
            .await?;

        tracing::debug!(recipient = %recipient.id, label = %label, "sent notice email");
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::mailer::NoOpMailer;
    use chrono::Utc;
    use noticekit_common::Signer;
    use noticekit_db::entities::notice_setting;
    use noticekit_db::repositories::{NoticeSettingRepository, NoticeTypeRepository, UserRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(email: Option<&str>) -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            email: email.map(ToString::to_string),
            language: Some("en".to_string()),
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

    fn backend(
        db: Arc<sea_orm::DatabaseConnection>,
        mailer: Arc<NoOpMailer>,
    ) -> EmailBackend {
        let preferences = PreferenceService::new(
            NoticeSettingRepository::new(db.clone()),
            NoticeTypeRepository::new(db.clone()),
            UserRepository::new(db),
            Signer::new("secret"),
            vec!["website".to_string(), "email".to_string()],
        );
        EmailBackend::new(
            1,
            "email",
            None,
            preferences,
            Arc::new(TemplateStore::with_defaults()),
            mailer,
            "noreply@example.com",
        )
    }

    #[tokio::test]
    async fn test_can_send_requires_email_address() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let backend = backend(db, Arc::new(NoOpMailer::new()));

        // No email: short-circuits before touching settings.
        let eligible = backend
            .can_send(&create_test_user(None), &create_test_notice_type())
            .await
            .unwrap();

        assert!(!eligible);
    }

    #[tokio::test]
    async fn test_can_send_consults_setting() {
        let muted = notice_setting::Model {
            id: "ns1".to_string(),
            user_id: "user1".to_string(),
            notice_type_id: "nt1".to_string(),
            medium_id: 1,
            send: false,
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[muted]])
                .into_connection(),
        );
        let backend = backend(db, Arc::new(NoOpMailer::new()));

        let eligible = backend
            .can_send(
                &create_test_user(Some("alice@example.com")),
                &create_test_notice_type(),
            )
            .await
            .unwrap();

        assert!(!eligible);
    }

    #[tokio::test]
    async fn test_deliver_renders_and_sends() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mailer = Arc::new(NoOpMailer::new());
        let backend = backend(db, mailer.clone());

        let mut context = NoticeContext::new();
        context.insert("notice".to_string(), json!("Comment posted"));
        context.insert("recipient".to_string(), json!("alice"));
        context.insert(
            "unsubscribe_link".to_string(),
            json!("https://example.com/notices/unsubscribe/email/tok/"),
        );

        let receipt = backend
            .deliver(
                &create_test_user(Some("alice@example.com")),
                None,
                &create_test_notice_type(),
                &context,
            )
            .await
            .unwrap();

        assert!(receipt.is_none());
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Comment posted");
        assert!(sent[0].text_body.contains("Unsubscribe"));
        assert_eq!(sent[0].to, vec!["alice@example.com".to_string()]);
    }
}
