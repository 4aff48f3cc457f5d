//! Emit worker: drains the notice queue.

use std::time::Duration;

use noticekit_common::{AppError, AppResult};
use noticekit_core::{Dispatcher, QUEUE_FORMAT_VERSION, QueuedBatch};
use noticekit_db::entities::notice_queue_batch;
use noticekit_db::repositories::NoticeQueueBatchRepository;
use tracing::{error, info};

/// Worker tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between drain passes.
    pub poll_interval: Duration,
    /// Batches taken per pass.
    pub batch_limit: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            batch_limit: 50,
        }
    }
}

/// Worker replaying queued notice batches in FIFO order.
pub struct EmitNoticesWorker {
    queue: NoticeQueueBatchRepository,
    dispatcher: Dispatcher,
    config: WorkerConfig,
}

impl EmitNoticesWorker {
    #[must_use]
    pub fn new(
        queue: NoticeQueueBatchRepository,
        dispatcher: Dispatcher,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            config,
        }
    }

    /// Drain the queue forever, one pass per poll interval.
    ///
    /// A failed pass is logged and retried on the next tick; the
    /// failing batch stays in the queue.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            interval.tick().await;
            match self.drain().await {
                Ok(0) => {}
                Ok(replayed) => info!(replayed, "drained notice queue"),
                Err(e) => error!(error = %e, code = e.error_code(), "notice queue pass failed"),
            }
        }
    }

    /// One pass: replay up to `batch_limit` batches, oldest first.
    ///
    /// Each batch is deleted only after its send completed, so a crash
    /// mid-batch re-delivers rather than drops. The pass stops at the
    /// first failing batch to preserve ordering.
    pub async fn drain(&self) -> AppResult<usize> {
        let batches = self.queue.oldest(self.config.batch_limit).await?;
        let mut replayed = 0_usize;

        for batch in batches {
            let batch_id = batch.id.clone();
            let delivered = self.process(batch).await.inspect_err(|e| {
                error!(batch_id, error = %e, "failed to replay queued batch");
            })?;
            self.queue.delete(&batch_id).await?;
            replayed += 1;
            tracing::debug!(batch_id, delivered, "replayed queued batch");
        }

        Ok(replayed)
    }

    async fn process(&self, batch: notice_queue_batch::Model) -> AppResult<usize> {
        let payload: QueuedBatch = serde_json::from_value(batch.payload)?;
        if payload.version != QUEUE_FORMAT_VERSION {
            return Err(AppError::Queue(format!(
                "unsupported batch version {} (expected {})",
                payload.version, QUEUE_FORMAT_VERSION
            )));
        }

        self.dispatcher
            .send_now(
                &payload.user_ids,
                &payload.label,
                &payload.context,
                payload.sender.as_ref(),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use noticekit_common::{DispatchConfig, Signer, SiteConfig};
    use noticekit_core::{BackendRegistry, NoticeContext, OpenRouteResolver};
    use noticekit_db::repositories::{NoticeTypeRepository, UserRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    fn worker(db: Arc<DatabaseConnection>) -> EmitNoticesWorker {
        let dispatcher = Dispatcher::new(
            NoticeTypeRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            NoticeQueueBatchRepository::new(db.clone()),
            Arc::new(BackendRegistry::from_backends(Vec::new())),
            Arc::new(OpenRouteResolver),
            None,
            Signer::new("secret"),
            SiteConfig {
                url: "https://example.com".to_string(),
                name: "example".to_string(),
            },
            DispatchConfig {
                queue_all: false,
                background_send: false,
                default_language: "en".to_string(),
            },
        );
        EmitNoticesWorker::new(
            NoticeQueueBatchRepository::new(db),
            dispatcher,
            WorkerConfig::default(),
        )
    }

    fn batch_row(id: &str, payload: serde_json::Value) -> notice_queue_batch::Model {
        notice_queue_batch::Model {
            id: id.to_string(),
            payload,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let payload = serde_json::to_value(QueuedBatch {
            version: 99,
            user_ids: vec![],
            label: "comment_posted".to_string(),
            context: NoticeContext::new(),
            on_site: true,
            sender: None,
        })
        .unwrap();

        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let worker = worker(db);

        let err = worker.process(batch_row("b1", payload)).await.unwrap_err();
        assert_eq!(err.error_code(), "QUEUE_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let worker = worker(db);

        let err = worker
            .process(batch_row("b1", json!({"not": "a batch"})))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "QUEUE_ERROR");
    }

    #[tokio::test]
    async fn test_drain_replays_and_deletes() {
        let payload = serde_json::to_value(QueuedBatch {
            version: QUEUE_FORMAT_VERSION,
            user_ids: vec![],
            label: "comment_posted".to_string(),
            context: NoticeContext::new(),
            on_site: true,
            sender: None,
        })
        .unwrap();

        let notice_type = noticekit_db::entities::notice_type::Model {
            id: "nt1".to_string(),
            label: "comment_posted".to_string(),
            display: "Comment posted".to_string(),
            description: String::new(),
            default_sensitivity: 2,
            created_at: Utc::now().into(),
        };

        // oldest() -> one batch; replay looks up the notice type; the
        // empty recipient list needs no user fetch; then the delete.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[batch_row("b1", payload)]])
                .append_query_results([[notice_type]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let worker = worker(db);
        let replayed = worker.drain().await.unwrap();
        assert_eq!(replayed, 1);
    }

    #[tokio::test]
    async fn test_drain_keeps_failing_batch() {
        let bad = serde_json::to_value(QueuedBatch {
            version: 99,
            user_ids: vec![],
            label: "comment_posted".to_string(),
            context: NoticeContext::new(),
            on_site: true,
            sender: None,
        })
        .unwrap();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[batch_row("b1", bad)]])
                .into_connection(),
        );

        // No delete is issued for the failing batch.
        let worker = worker(db);
        let err = worker.drain().await.unwrap_err();
        assert_eq!(err.error_code(), "QUEUE_ERROR");
    }
}
