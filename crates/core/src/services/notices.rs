//! Viewer-facing notice operations.

use std::sync::Arc;

use noticekit_common::{AppError, AppResult};
use noticekit_db::entities::notice;
use noticekit_db::repositories::{NoticeRepository, NoticeTypeRepository};
use serde_json::{Value, json};

use crate::services::entity::EntityRef;
use crate::services::routing::RouteResolver;
use crate::services::templates::{NoticeContext, TemplateStore};

/// The user performing a notice operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub is_admin: bool,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id: id.into(),
            is_admin,
        }
    }
}

/// One entry of a bulk notice update.
#[derive(Debug, Clone, Default)]
pub struct BulkAction {
    pub notice_id: String,
    pub unseen: Option<bool>,
    pub archived: Option<bool>,
    pub delete: bool,
}

/// Operations a signed-in user performs on their own notices.
#[derive(Clone)]
pub struct NoticeService {
    notices: NoticeRepository,
    notice_types: NoticeTypeRepository,
    templates: Arc<TemplateStore>,
    routes: Arc<dyn RouteResolver>,
}

impl NoticeService {
    #[must_use]
    pub fn new(
        notices: NoticeRepository,
        notice_types: NoticeTypeRepository,
        templates: Arc<TemplateStore>,
        routes: Arc<dyn RouteResolver>,
    ) -> Self {
        Self {
            notices,
            notice_types,
            templates,
            routes,
        }
    }

    /// A user's notices, newest first.
    pub async fn notices_for(
        &self,
        user_id: &str,
        archived: bool,
        unseen: Option<bool>,
    ) -> AppResult<Vec<notice::Model>> {
        self.notices.notices_for(user_id, archived, unseen).await
    }

    /// Count unseen, non-archived notices.
    pub async fn unseen_count(&self, user_id: &str) -> AppResult<u64> {
        self.notices.unseen_count(user_id).await
    }

    /// Mark every unseen notice as seen. Returns the number flipped.
    pub async fn mark_all_seen(&self, user_id: &str) -> AppResult<u64> {
        self.notices.mark_all_seen(user_id).await
    }

    /// Mark every unseen notice from one sender entity to the recipient
    /// as seen, e.g. after the recipient viewed the sender.
    pub async fn mark_read(&self, sender: &EntityRef, recipient_id: &str) -> AppResult<u64> {
        self.notices
            .mark_seen_for_sender(&sender.kind, &sender.id, recipient_id)
            .await
    }

    /// One notice, restricted to its recipient. Optionally marks it
    /// seen as a side effect of viewing.
    pub async fn single(
        &self,
        notice_id: &str,
        actor: &Actor,
        mark_seen: bool,
    ) -> AppResult<notice::Model> {
        let notice = self.notices.get_by_id(notice_id).await?;
        if notice.recipient_id != actor.id {
            // Someone else's notice looks like a missing one.
            return Err(AppError::NotFound(format!("notice {notice_id}")));
        }
        if mark_seen && notice.unseen {
            return self.notices.set_unseen(notice, false).await;
        }
        Ok(notice)
    }

    /// Resolve the redirect target for viewing a notice's sender,
    /// marking the notice seen.
    ///
    /// The caller's override wins, then the stored sender path, then a
    /// path derived from the sender reference; each candidate must
    /// resolve to a served route. No resolvable candidate is
    /// not-found.
    pub async fn view_sender(
        &self,
        notice_id: &str,
        actor: &Actor,
        override_path: Option<&str>,
    ) -> AppResult<String> {
        let notice = self.notices.get_by_id(notice_id).await?;
        if notice.recipient_id != actor.id {
            return Err(AppError::Forbidden(
                "notice belongs to another user".to_string(),
            ));
        }

        let derived = match (&notice.sender_kind, &notice.sender_id) {
            (Some(kind), Some(id)) => Some(EntityRef::new(kind.clone(), id.clone()).path()),
            _ => None,
        };
        let target = [
            override_path.map(ToString::to_string),
            notice.sender_path.clone(),
            derived,
        ]
        .into_iter()
        .flatten()
        .find(|path| self.routes.resolve(path))
        .ok_or_else(|| AppError::NotFound(format!("sender of notice {notice_id}")))?;

        if notice.unseen {
            self.notices.set_unseen(notice, false).await?;
        }
        Ok(target)
    }

    /// Flip the archived flag. Recipient or admin only.
    pub async fn toggle_archived(
        &self,
        notice_id: &str,
        actor: &Actor,
    ) -> AppResult<notice::Model> {
        let notice = self.owned(notice_id, actor).await?;
        let archived = !notice.archived;
        self.notices.set_archived(notice, archived).await
    }

    /// Flip the unseen flag. Recipient or admin only.
    pub async fn toggle_unseen(&self, notice_id: &str, actor: &Actor) -> AppResult<notice::Model> {
        let notice = self.owned(notice_id, actor).await?;
        let unseen = !notice.unseen;
        self.notices.set_unseen(notice, unseen).await
    }

    /// Delete a notice. Recipient or admin only.
    pub async fn delete(&self, notice_id: &str, actor: &Actor) -> AppResult<()> {
        let notice = self.owned(notice_id, actor).await?;
        self.notices.delete(notice).await
    }

    /// Apply a batch of per-notice updates, e.g. from the notices list
    /// form. Notices that disappeared since the form was rendered are
    /// skipped. Returns the number of notices changed.
    pub async fn apply_bulk(&self, actor: &Actor, actions: &[BulkAction]) -> AppResult<usize> {
        let mut changed = 0_usize;
        for action in actions {
            let Some(mut notice) = self.notices.find_by_id(&action.notice_id).await? else {
                continue;
            };
            if notice.recipient_id != actor.id && !actor.is_admin {
                return Err(AppError::Forbidden(
                    "notice belongs to another user".to_string(),
                ));
            }

            let mut touched = false;
            if let Some(unseen) = action.unseen {
                if notice.unseen != unseen {
                    notice = self.notices.set_unseen(notice, unseen).await?;
                    touched = true;
                }
            }
            if let Some(archived) = action.archived {
                if notice.archived != archived {
                    notice = self.notices.set_archived(notice, archived).await?;
                    touched = true;
                }
            }
            if action.delete {
                self.notices.delete(notice).await?;
                touched = true;
            }
            if touched {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Render a notice through a notification template, using the
    /// stored context plus the notice's own ID.
    pub async fn render(&self, notice: &notice::Model, template: &str) -> AppResult<String> {
        let notice_type = self.notice_types.get_by_id(&notice.notice_type_id).await?;

        let mut context = match &notice.data {
            Value::Object(map) => map.clone(),
            _ => NoticeContext::new(),
        };
        context.insert("notice_id".to_string(), json!(notice.id));
        self.templates
            .format_notification(template, &notice_type.label, &context)
    }

    async fn owned(&self, notice_id: &str, actor: &Actor) -> AppResult<notice::Model> {
        let notice = self.notices.get_by_id(notice_id).await?;
        if notice.recipient_id != actor.id && !actor.is_admin {
            return Err(AppError::Forbidden(
                "notice belongs to another user".to_string(),
            ));
        }
        Ok(notice)
    }
}
