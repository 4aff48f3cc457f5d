//! Per-user delivery preferences.
//!
//! Preference rows are created lazily: the first time a (user, notice
//! type, medium) triple is consulted, a row is created with the
//! medium's computed default, and that row is authoritative from then
//! on. Changing a notice type's default later never retroactively
//! flips users who already have a row.

use noticekit_common::{AppError, AppResult, IdGenerator, Signer};
use noticekit_db::entities::{notice_setting, notice_type, user};
use noticekit_db::repositories::{NoticeSettingRepository, NoticeTypeRepository, UserRepository};

/// Preference resolution and the unsubscribe flow.
#[derive(Clone)]
pub struct PreferenceService {
    settings: NoticeSettingRepository,
    notice_types: NoticeTypeRepository,
    users: UserRepository,
    signer: Signer,
    /// Backend labels in medium order; position is the medium ID.
    media: Vec<String>,
    id_gen: IdGenerator,
}

impl PreferenceService {
    #[must_use]
    pub fn new(
        settings: NoticeSettingRepository,
        notice_types: NoticeTypeRepository,
        users: UserRepository,
        signer: Signer,
        media: Vec<String>,
    ) -> Self {
        Self {
            settings,
            notice_types,
            users,
            signer,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether a notice type is on by default for a medium of the given
    /// sensitivity.
    #[must_use]
    pub const fn default_send(notice_type: &notice_type::Model, medium_sensitivity: i32) -> bool {
        medium_sensitivity <= notice_type.default_sensitivity
    }

    /// The user's setting row for the triple, created with the computed
    /// default when absent.
    pub async fn setting(
        &self,
        user: &user::Model,
        notice_type: &notice_type::Model,
        medium_id: i16,
        medium_sensitivity: i32,
    ) -> AppResult<notice_setting::Model> {
        self.settings
            .get_or_create(
                &self.id_gen.generate(),
                &user.id,
                &notice_type.id,
                medium_id,
                Self::default_send(notice_type, medium_sensitivity),
            )
            .await
    }

    /// Whether the user wants the notice type on the medium.
    pub async fn should_send(
        &self,
        user: &user::Model,
        notice_type: &notice_type::Model,
        medium_id: i16,
        medium_sensitivity: i32,
    ) -> AppResult<bool> {
        let setting = self
            .setting(user, notice_type, medium_id, medium_sensitivity)
            .await?;
        Ok(setting.send)
    }

    /// Set the send flag for one (user, label, medium) cell of the
    /// preference grid.
    pub async fn set_send(
        &self,
        user: &user::Model,
        label: &str,
        medium_id: i16,
        medium_sensitivity: i32,
        send: bool,
    ) -> AppResult<notice_setting::Model> {
        let notice_type = self.notice_types.get_by_label(label).await?;
        let setting = self
            .setting(user, &notice_type, medium_id, medium_sensitivity)
            .await?;
        if setting.send == send {
            return Ok(setting);
        }
        self.settings.set_send(setting, send).await
    }

    /// All settings for a user, for rendering the preference grid.
    pub async fn settings_for(&self, user_id: &str) -> AppResult<Vec<notice_setting::Model>> {
        self.settings.find_by_user(user_id).await
    }

    /// One-click unsubscribe: turn off every notice type on a medium
    /// for the user identified by the signed token.
    ///
    /// A bad token, an unknown medium, and a token for a user that no
    /// longer exists are all reported as not-found, so the endpoint
    /// does not distinguish forged links from dead ones. Returns the
    /// unsubscribed user's ID.
    pub async fn unsubscribe(&self, medium_label: &str, token: &str) -> AppResult<String> {
        let user_id = self
            .signer
            .unsign(token)
            .map_err(|_| AppError::NotFound("unsubscribe link".to_string()))?;
        let medium_id = self
            .media
            .iter()
            .position(|label| label == medium_label)
            .ok_or_else(|| AppError::NotFound(format!("medium '{medium_label}'")))?;
        let medium_id =
            i16::try_from(medium_id).map_err(|_| AppError::Config("too many backends".into()))?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("unsubscribe link".to_string()))?;

        let changed = self
            .settings
            .disable_all_for_medium(&user.id, medium_id)
            .await?;
        tracing::info!(user_id, medium_label, changed, "unsubscribed user from medium");
        Ok(user_id)
    }

    /// Signed token identifying a user in unsubscribe links.
    pub fn unsubscribe_token(&self, user_id: &str) -> AppResult<String> {
        self.signer.sign(user_id)
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
            description: "someone commented on your entry".to_string(),
            default_sensitivity,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            language: None,
            is_active: true,
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> PreferenceService {
        PreferenceService::new(
            NoticeSettingRepository::new(db.clone()),
            NoticeTypeRepository::new(db.clone()),
            UserRepository::new(db),
            Signer::new("secret"),
            vec!["website".to_string(), "email".to_string()],
        )
    }

    #[test]
    fn test_default_send_threshold() {
        let nt = create_test_notice_type(2);
        // website (sensitivity 1) and email (2) both pass at default 2
        assert!(PreferenceService::default_send(&nt, 1));
        assert!(PreferenceService::default_send(&nt, 2));
        assert!(!PreferenceService::default_send(&nt, 3));
    }

    #[tokio::test]
    async fn test_should_send_creates_default_row() {
        let created = notice_setting::Model {
            id: "ns1".to_string(),
            user_id: "user1".to_string(),
            notice_type_id: "nt1".to_string(),
            medium_id: 1,
            send: true,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notice_setting::Model>::new()])
                .append_query_results([[created]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = service(db);
        let send = service
            .should_send(&create_test_user(), &create_test_notice_type(2), 1, 2)
            .await
            .unwrap();

        assert!(send);
    }

    #[tokio::test]
    async fn test_unsubscribe_round_trip() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 4,
                }])
                .into_connection(),
        );

        let service = service(db);
        let token = service.unsubscribe_token("user1").unwrap();
        let user_id = service.unsubscribe("email", &token).await.unwrap();

        assert_eq!(user_id, "user1");
    }

    #[tokio::test]
    async fn test_unsubscribe_token_for_deleted_user_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = service(db);
        let token = service.unsubscribe_token("ghost").unwrap();
        let err = service.unsubscribe("email", &token).await.unwrap_err();

        // A valid token whose user is gone reads as a dead link.
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unsubscribe_rejects_forged_token() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = service(db);
        let err = service
            .unsubscribe("email", "user2:0000deadbeef")
            .await
            .unwrap_err();

        // Forged tokens look like unknown links, not signature faults.
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_medium() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = service(db);
        let token = service.unsubscribe_token("user1").unwrap();
        let err = service.unsubscribe("pigeon", &token).await.unwrap_err();

        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
