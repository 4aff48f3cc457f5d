//! Notice dispatch.
//!
//! The dispatcher resolves a label to its notice type, builds the
//! per-recipient context, and fans each notice out across the backend
//! registry. A send is routed one of three ways: immediately in the
//! calling task, immediately on a background task, or appended to the
//! database queue for the worker to replay.

use std::collections::HashMap;
use std::sync::Arc;

use noticekit_common::{
    AppError, AppResult, DispatchConfig, IdGenerator, Signer, SiteConfig,
};
use noticekit_db::entities::user;
use noticekit_db::repositories::{
    NoticeQueueBatchRepository, NoticeTypeRepository, UserRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::services::backends::BackendRegistry;
use crate::services::entity::EntityRef;
use crate::services::language::LanguageStore;
use crate::services::routing::RouteResolver;
use crate::services::templates::NoticeContext;

/// Queued batch payload format version. Bumped whenever the payload
/// shape changes; the worker refuses batches it does not understand.
pub const QUEUE_FORMAT_VERSION: u32 = 1;

/// A deferred send, serialized into the queue table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedBatch {
    pub version: u32,
    pub user_ids: Vec<String>,
    pub label: String,
    pub context: NoticeContext,
    pub on_site: bool,
    pub sender: Option<EntityRef>,
}

/// Caller flags steering send routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// Force the send onto the queue.
    pub queue: bool,
    /// Force the send to happen immediately.
    pub now: bool,
}

/// How a send was routed.
#[derive(Debug)]
pub enum SendOutcome {
    /// Delivered in the calling task; carries the delivery count.
    Sent(usize),
    /// Appended to the queue; carries the batch ID.
    Queued(String),
    /// Running on a background task. Callers that need completion or
    /// the delivery count await the handle; fire-and-forget callers
    /// drop it.
    Background(JoinHandle<AppResult<usize>>),
}

/// Recipient set for a send.
///
/// Callers with models in hand avoid a refetch; callers with only IDs
/// pass those.
pub enum Recipients<'a> {
    Ids(&'a [String]),
    Users(&'a [user::Model]),
}

impl Recipients<'_> {
    fn into_ids(self) -> Vec<String> {
        match self {
            Recipients::Ids(ids) => ids.to_vec(),
            Recipients::Users(users) => users.iter().map(|user| user.id.clone()).collect(),
        }
    }
}

/// Service fanning notices out to delivery backends.
#[derive(Clone)]
pub struct Dispatcher {
    notice_types: NoticeTypeRepository,
    users: UserRepository,
    queue: NoticeQueueBatchRepository,
    registry: Arc<BackendRegistry>,
    routes: Arc<dyn RouteResolver>,
    language: Option<Arc<dyn LanguageStore>>,
    signer: Signer,
    site: SiteConfig,
    dispatch: DispatchConfig,
    id_gen: IdGenerator,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        notice_types: NoticeTypeRepository,
        users: UserRepository,
        queue: NoticeQueueBatchRepository,
        registry: Arc<BackendRegistry>,
        routes: Arc<dyn RouteResolver>,
        language: Option<Arc<dyn LanguageStore>>,
        signer: Signer,
        site: SiteConfig,
        dispatch: DispatchConfig,
    ) -> Self {
        Self {
            notice_types,
            users,
            queue,
            registry,
            routes,
            language,
            signer,
            site,
            dispatch,
            id_gen: IdGenerator::new(),
        }
    }

    /// Route a send according to the caller flags and process
    /// configuration.
    ///
    /// An explicit `queue` wins; otherwise the process-wide queue-all
    /// switch routes to the queue even when `now` is set; otherwise the
    /// send happens immediately, on a background task unless background
    /// sending is disabled. Setting both flags is an error, raised
    /// before anything is stored.
    pub async fn send(
        &self,
        recipients: Recipients<'_>,
        label: &str,
        context: &NoticeContext,
        sender: Option<&EntityRef>,
        options: SendOptions,
    ) -> AppResult<SendOutcome> {
        if options.queue && options.now {
            return Err(AppError::BadRequest(
                "'queue' and 'now' cannot both be set".to_string(),
            ));
        }

        let user_ids = recipients.into_ids();

        if options.queue || self.dispatch.queue_all {
            let batch_id = self
                .queue_batch(user_ids, label, context, true, sender)
                .await?;
            return Ok(SendOutcome::Queued(batch_id));
        }

        if self.dispatch.background_send {
            let dispatcher = self.clone();
            let label = label.to_string();
            let context = context.clone();
            let sender = sender.cloned();
            let handle = tokio::spawn(async move {
                dispatcher
                    .send_now(&user_ids, &label, &context, sender.as_ref())
                    .await
            });
            return Ok(SendOutcome::Background(handle));
        }

        let delivered = self.send_now(&user_ids, label, context, sender).await?;
        Ok(SendOutcome::Sent(delivered))
    }

    /// Send to every active user except those excluded.
    pub async fn broadcast(
        &self,
        label: &str,
        context: &NoticeContext,
        sender: Option<&EntityRef>,
        exclude: &[String],
        options: SendOptions,
    ) -> AppResult<SendOutcome> {
        let all = self.users.all_active_ids().await?;
        let user_ids: Vec<String> = all
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .collect();
        self.send(Recipients::Ids(&user_ids), label, context, sender, options)
            .await
    }

    /// Append a batch to the queue. Returns the batch ID.
    pub async fn queue(
        &self,
        recipients: Recipients<'_>,
        label: &str,
        context: &NoticeContext,
        on_site: bool,
        sender: Option<&EntityRef>,
    ) -> AppResult<String> {
        self.queue_batch(recipients.into_ids(), label, context, on_site, sender)
            .await
    }

    async fn queue_batch(
        &self,
        user_ids: Vec<String>,
        label: &str,
        context: &NoticeContext,
        on_site: bool,
        sender: Option<&EntityRef>,
    ) -> AppResult<String> {
        let batch = QueuedBatch {
            version: QUEUE_FORMAT_VERSION,
            user_ids,
            label: label.to_string(),
            context: context.clone(),
            on_site,
            sender: sender.cloned(),
        };
        let payload = serde_json::to_value(&batch)?;
        let created = self.queue.create(&self.id_gen.generate(), payload).await?;
        tracing::debug!(batch_id = %created.id, label, "queued notice batch");
        Ok(created.id)
    }

    /// Deliver a notice to each recipient across all backends, in the
    /// calling task.
    ///
    /// The store backend runs first for each recipient so its receipt
    /// is visible in the context of the remaining backends. The first
    /// backend error aborts the loop; queued batches thereby stay in
    /// place for a retry after a transient fault.
    pub async fn send_now(
        &self,
        user_ids: &[String],
        label: &str,
        extra_context: &NoticeContext,
        sender: Option<&EntityRef>,
    ) -> AppResult<usize> {
        let notice_type = self.notice_types.get_by_label(label).await?;

        let fetched = self.users.find_by_ids(user_ids).await?;
        let mut by_id: HashMap<&str, &user::Model> =
            fetched.iter().map(|user| (user.id.as_str(), user)).collect();
        let recipients: Vec<&user::Model> = user_ids
            .iter()
            .filter_map(|id| by_id.remove(id.as_str()))
            .collect();

        let root = self.site.url.trim_end_matches('/');
        let sender_path = self.sender_path(extra_context, sender);
        let mut delivered = 0_usize;

        for recipient in recipients {
            let language = self.resolve_language(recipient)?;
            let token = self.signer.sign(&recipient.id)?;

            let mut context = extra_context.clone();
            if !sender_path.is_empty() {
                context.insert("sender_path".to_string(), json!(sender_path));
            }

            // Store first. Only the caller-supplied context (plus the
            // sender path) lands in the stored notice row.
            let mut stored = false;
            if let Some(store) = self.registry.store() {
                if store.can_send(recipient, &notice_type).await? {
                    let receipt = store
                        .deliver(recipient, sender, &notice_type, &context)
                        .await?;
                    delivered += 1;
                    stored = true;
                    if let Some(receipt) = receipt {
                        context.insert("notice_id".to_string(), json!(receipt.notice_id));
                        context.insert(
                            "sender_url".to_string(),
                            json!(format!("{root}{}", receipt.sender_url)),
                        );
                    }
                }
            }
            if !stored {
                context.insert("notice_id".to_string(), Value::Null);
                context.insert("sender_url".to_string(), json!(format!("{root}{sender_path}")));
            }

            context.insert("recipient".to_string(), json!(recipient.username));
            context.insert("recipient_id".to_string(), json!(recipient.id));
            context.insert("notice".to_string(), json!(notice_type.display));
            context.insert("notice_label".to_string(), json!(notice_type.label));
            context.insert("language".to_string(), json!(language));
            context.insert("current_site".to_string(), json!(self.site.name));
            context.insert("root_url".to_string(), json!(root));
            context.insert("notices_url".to_string(), json!(format!("{root}/notices/")));
            context.insert(
                "unsubscribe_link".to_string(),
                json!(format!("{root}/notices/unsubscribe/email/{token}/")),
            );
            if let Some(sender) = sender {
                context.insert("sender".to_string(), json!(sender.path()));
                context.insert("sender_kind".to_string(), json!(sender.kind));
                context.insert("sender_id".to_string(), json!(sender.id));
            }

            for backend in self.registry.iter().filter(|backend| !backend.is_store()) {
                if backend.can_send(recipient, &notice_type).await? {
                    backend
                        .deliver(recipient, sender, &notice_type, &context)
                        .await?;
                    delivered += 1;
                }
            }
        }

        tracing::debug!(label, delivered, "dispatched notices");
        Ok(delivered)
    }

    fn resolve_language(&self, user: &user::Model) -> AppResult<String> {
        match &self.language {
            Some(store) => match store.preferred_language(user) {
                Ok(language) => Ok(language),
                Err(AppError::LanguageUnavailable(_)) => {
                    Ok(self.dispatch.default_language.clone())
                }
                Err(e) => Err(e),
            },
            None => Ok(self.dispatch.default_language.clone()),
        }
    }

    /// Resolve the sender link to store with notices.
    ///
    /// A caller-supplied `sender_path` in the context wins. Otherwise
    /// the path is derived from the sender reference, and dropped when
    /// the site serves no such route.
    fn sender_path(&self, context: &NoticeContext, sender: Option<&EntityRef>) -> String {
        if let Some(path) = context.get("sender_path").and_then(Value::as_str) {
            return path.to_string();
        }
        match sender {
            Some(entity) => {
                let path = entity.path();
                if self.routes.resolve(&path) {
                    path
                } else {
                    tracing::debug!(%entity, "sender has no resolvable route, dropping link");
                    String::new()
                }
            }
            None => String::new(),
        }
    }
}
