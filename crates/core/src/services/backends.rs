//! Delivery backend trait and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use noticekit_common::{AppError, AppResult, BackendEntry};
use noticekit_db::entities::{notice_type, user};

use crate::services::entity::EntityRef;
use crate::services::templates::NoticeContext;

/// Receipt from a store backend, used to enrich the context handed to
/// the remaining backends for the same recipient.
#[derive(Debug, Clone)]
pub struct StoreReceipt {
    /// ID of the stored notice row.
    pub notice_id: String,
    /// Site-relative URL where the recipient can view the notice.
    pub sender_url: String,
}

/// A delivery medium.
///
/// Each backend occupies one medium slot, identified by its position in
/// the configured backend list. Per-user settings reference that slot,
/// so backend order must stay stable across releases.
#[async_trait]
pub trait NoticeBackend: Send + Sync {
    /// Stable medium slot for this backend.
    fn medium_id(&self) -> i16;

    /// Configured display label, e.g. `"email"`.
    fn label(&self) -> &str;

    /// How intrusive this medium is. A notice type's default
    /// sensitivity must be at least this for the backend to be on by
    /// default.
    fn spam_sensitivity(&self) -> i32;

    /// Whether this backend persists notices. The dispatcher runs the
    /// store backend first so its receipt is visible to the others.
    fn is_store(&self) -> bool {
        false
    }

    /// Whether this backend should deliver to the user for the notice
    /// type. Resolves the lazy per-user setting, creating it with its
    /// computed default on first access.
    async fn can_send(
        &self,
        user: &user::Model,
        notice_type: &notice_type::Model,
    ) -> AppResult<bool>;

    /// Deliver one notice. Store backends return a receipt.
    async fn deliver(
        &self,
        recipient: &user::Model,
        sender: Option<&EntityRef>,
        notice_type: &notice_type::Model,
        context: &NoticeContext,
    ) -> AppResult<Option<StoreReceipt>>;
}

/// Constructor for a backend: medium slot, configured label, optional
/// sensitivity override.
pub type BackendFactory =
    Box<dyn Fn(i16, &str, Option<i32>) -> Arc<dyn NoticeBackend> + Send + Sync>;

/// Named backend constructors, looked up by the `backend` field of a
/// configured entry.
#[derive(Default)]
pub struct BackendFactories {
    factories: HashMap<String, BackendFactory>,
}

impl BackendFactories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        self.factories.insert(name.into(), factory);
    }
}

/// The process-wide set of delivery backends, in configured order.
pub struct BackendRegistry {
    backends: Vec<Arc<dyn NoticeBackend>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("labels", &self.medium_labels())
            .finish_non_exhaustive()
    }
}

impl BackendRegistry {
    /// Instantiate backends from configuration.
    ///
    /// Medium IDs are assigned from list position. Unknown factory
    /// names and duplicate labels are configuration errors.
    pub fn load(entries: &[BackendEntry], factories: &BackendFactories) -> AppResult<Self> {
        let mut backends: Vec<Arc<dyn NoticeBackend>> = Vec::with_capacity(entries.len());

        for (slot, entry) in entries.iter().enumerate() {
            let factory = factories.factories.get(&entry.backend).ok_or_else(|| {
                AppError::Config(format!("unknown backend factory '{}'", entry.backend))
            })?;
            if backends.iter().any(|b| b.label() == entry.label) {
                return Err(AppError::Config(format!(
                    "duplicate backend label '{}'",
                    entry.label
                )));
            }
            let medium_id =
                i16::try_from(slot).map_err(|_| AppError::Config("too many backends".into()))?;
            backends.push(factory(medium_id, &entry.label, entry.spam_sensitivity));
        }

        tracing::debug!(count = backends.len(), "loaded notice backends");
        Ok(Self { backends })
    }

    /// Build a registry from already-constructed backends, in medium
    /// order. For embedders that wire backends programmatically.
    #[must_use]
    pub fn from_backends(backends: Vec<Arc<dyn NoticeBackend>>) -> Self {
        Self { backends }
    }

    /// Backends in medium order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn NoticeBackend>> {
        self.backends.iter()
    }

    /// The store backend, if one is configured.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn NoticeBackend>> {
        self.backends.iter().find(|backend| backend.is_store())
    }

    /// Backend by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Arc<dyn NoticeBackend>> {
        self.backends.iter().find(|backend| backend.label() == label)
    }

    /// Labels in medium order, for the preference grid.
    #[must_use]
    pub fn medium_labels(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|backend| backend.label().to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::RecordingBackend;
    use super::*;

    fn recording_factory(store: bool) -> BackendFactory {
        Box::new(move |medium_id, label, _sensitivity| {
            Arc::new(RecordingBackend::new(medium_id, label, store))
        })
    }

    fn entry(label: &str, backend: &str) -> BackendEntry {
        BackendEntry {
            label: label.to_string(),
            backend: backend.to_string(),
            spam_sensitivity: None,
        }
    }

    #[test]
    fn test_load_assigns_medium_ids_in_order() {
        let mut factories = BackendFactories::new();
        factories.register("website", recording_factory(true));
        factories.register("email", recording_factory(false));

        let registry = BackendRegistry::load(
            &[entry("website", "website"), entry("email", "email")],
            &factories,
        )
        .unwrap();

        let ids: Vec<i16> = registry.iter().map(|b| b.medium_id()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(registry.store().unwrap().label(), "website");
    }

    #[test]
    fn test_unknown_factory_is_config_error() {
        let factories = BackendFactories::new();
        let err = BackendRegistry::load(&[entry("website", "missing")], &factories).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_duplicate_label_is_config_error() {
        let mut factories = BackendFactories::new();
        factories.register("website", recording_factory(true));

        let err = BackendRegistry::load(
            &[entry("website", "website"), entry("website", "website")],
            &factories,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
