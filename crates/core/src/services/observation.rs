//! Observation registry.
//!
//! Observations subscribe a user to future notices about one entity
//! under one notice type. Observing is an explicit follow; delivery
//! preferences still apply when the notice is actually sent.

use noticekit_common::{AppError, AppResult, IdGenerator, ObservationConfig};
use noticekit_db::entities::observation;
use noticekit_db::repositories::{NoticeTypeRepository, ObservationRepository};
use sea_orm::Set;
use serde_json::json;

use crate::services::dispatcher::{Dispatcher, Recipients, SendOptions};
use crate::services::entity::{DeletedEntity, EntityRef};
use crate::services::templates::NoticeContext;

/// Service managing observations and their fan-out.
#[derive(Clone)]
pub struct ObservationService {
    observations: ObservationRepository,
    notice_types: NoticeTypeRepository,
    dispatcher: Dispatcher,
    config: ObservationConfig,
    id_gen: IdGenerator,
}

impl ObservationService {
    #[must_use]
    pub fn new(
        observations: ObservationRepository,
        notice_types: NoticeTypeRepository,
        dispatcher: Dispatcher,
        config: ObservationConfig,
    ) -> Self {
        Self {
            observations,
            notice_types,
            dispatcher,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Start observing an entity under each label. Idempotent: labels
    /// already observed are skipped. Unknown labels are an error.
    ///
    /// Returns the number of observations created.
    pub async fn observe(
        &self,
        observed: &EntityRef,
        observer_id: &str,
        labels: &[String],
    ) -> AppResult<usize> {
        let mut created = 0_usize;
        for label in labels {
            if self
                .is_observing(observed, Some(observer_id), std::slice::from_ref(label))
                .await?
            {
                continue;
            }
            let notice_type = self.notice_types.get_by_label(label).await?;
            let active = observation::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(observer_id.to_string()),
                notice_type_id: Set(notice_type.id),
                observed_kind: Set(observed.kind.clone()),
                observed_id: Set(observed.id.clone()),
                send: Set(true),
                added: Set(chrono::Utc::now().into()),
            };
            self.observations.create(active).await?;
            created += 1;
        }
        tracing::debug!(observer_id, %observed, created, "observe");
        Ok(created)
    }

    /// Stop observing an entity under each label. Labels not observed,
    /// and unknown labels, are silently skipped.
    pub async fn stop_observing(
        &self,
        observed: &EntityRef,
        observer_id: &str,
        labels: &[String],
    ) -> AppResult<usize> {
        let mut removed = 0_usize;
        for label in labels {
            let Some(notice_type) = self.notice_types.find_by_label(label).await? else {
                continue;
            };
            let edges = self
                .observations
                .get_for(&observed.kind, &observed.id, observer_id, &notice_type.id)
                .await?;
            for edge in edges {
                self.observations.delete(&edge.id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Whether the observer observes the entity under every given
    /// label. An anonymous observer observes nothing.
    pub async fn is_observing(
        &self,
        observed: &EntityRef,
        observer_id: Option<&str>,
        labels: &[String],
    ) -> AppResult<bool> {
        let Some(observer_id) = observer_id else {
            return Ok(false);
        };
        for label in labels {
            let Some(notice_type) = self.notice_types.find_by_label(label).await? else {
                return Ok(false);
            };
            let edges = self
                .observations
                .get_for(&observed.kind, &observed.id, observer_id, &notice_type.id)
                .await?;
            if edges.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Observations of an entity under a label, newest first.
    pub async fn observers(
        &self,
        observed: &EntityRef,
        label: &str,
    ) -> AppResult<Vec<observation::Model>> {
        let Some(notice_type) = self.notice_types.find_by_label(label).await? else {
            return Ok(Vec::new());
        };
        self.observations
            .observers(&observed.kind, &observed.id, &notice_type.id)
            .await
    }

    /// Notify every observer of an entity, except excluded users and
    /// muted observations.
    ///
    /// Returns the users actually notified, so callers can exclude
    /// them from any follow-up broadcast for the same event. When no
    /// explicit sender is given, the observed entity stands in as the
    /// sender and the context is flagged accordingly.
    pub async fn send_notices_for(
        &self,
        observed: &EntityRef,
        label: &str,
        extra_context: &NoticeContext,
        exclude: &[String],
        sender: Option<&EntityRef>,
    ) -> AppResult<Vec<String>> {
        let mut notified = Vec::new();
        for edge in self.observers(observed, label).await? {
            if exclude.contains(&edge.user_id) || !edge.send {
                continue;
            }
            let mut context = extra_context.clone();
            let effective_sender = match sender {
                Some(sender) => sender.clone(),
                None => {
                    context.insert("alter_desc".to_string(), json!(true));
                    observed.clone()
                }
            };
            context.insert("observed".to_string(), json!(observed.path()));
            self.dispatcher
                .send(
                    Recipients::Ids(std::slice::from_ref(&edge.user_id)),
                    label,
                    &context,
                    Some(&effective_sender),
                    SendOptions::default(),
                )
                .await?;
            notified.push(edge.user_id);
        }
        Ok(notified)
    }

    /// Everything an observer follows of one entity kind under any of
    /// the given labels, deduplicated, insertion order preserved. An
    /// anonymous observer gets an empty list.
    pub async fn get_observations(
        &self,
        observer_id: Option<&str>,
        observed_kind: &str,
        labels: &[String],
    ) -> AppResult<Vec<EntityRef>> {
        let Some(observer_id) = observer_id else {
            return Ok(Vec::new());
        };
        let notice_types = self.notice_types.find_by_labels(labels).await?;
        let notice_type_ids: Vec<String> =
            notice_types.into_iter().map(|nt| nt.id).collect();

        let edges = self
            .observations
            .find_by_user_and_kind(observer_id, observed_kind, &notice_type_ids)
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut entities = Vec::new();
        for edge in edges {
            let entity = EntityRef::new(edge.observed_kind, edge.observed_id);
            if seen.insert(entity.clone()) {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Mute or unmute one observation. Only its owner may change it.
    pub async fn set_send(
        &self,
        observation_id: &str,
        user_id: &str,
        send: bool,
    ) -> AppResult<observation::Model> {
        let edge = self
            .observations
            .find_by_id(observation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("observation {observation_id}")))?;
        if edge.user_id != user_id {
            return Err(AppError::Forbidden(
                "observation belongs to another user".to_string(),
            ));
        }
        self.observations.set_send(edge, send).await
    }

    /// Remove observations referencing a deleted entity.
    ///
    /// Cleans up observations of the entity itself when its kind has
    /// ever been observed, then follows the configured cascade
    /// attributes into the entity's relations. Returns the number of
    /// rows removed; disabled cleanup removes nothing.
    pub async fn on_entity_deleted(&self, deleted: &DeletedEntity) -> AppResult<u64> {
        if !self.config.auto_delete {
            return Ok(0);
        }

        let mut removed = 0_u64;
        let observed_kinds = self.observations.distinct_observed_kinds().await?;
        if observed_kinds.contains(&deleted.entity.kind) {
            removed += self
                .observations
                .delete_for_entity(&deleted.entity.kind, &deleted.entity.id)
                .await?;
        }

        if let Some(attributes) = self.config.cascade_attributes.get(&deleted.entity.kind) {
            for attribute in attributes {
                if let Some(target) = deleted.related.get(attribute) {
                    removed += self
                        .observations
                        .delete_for_entity(&target.kind, &target.id)
                        .await?;
                }
            }
        }

        if removed > 0 {
            tracing::debug!(entity = %deleted.entity, removed, "cleaned up observations");
        }
        Ok(removed)
    }
}
