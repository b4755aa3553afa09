use super::diff::{EntityDiff, FlatMap, diff, flatten_excluding_computed};
use super::publisher::{AuditEvent, AuditPublisher};
use crate::core::Result;
use crate::entity::DynamicEntity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Before and after values of one observed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange<V> {
    pub field: String,
    pub before: V,
    pub after: V,
}

impl<V: fmt::Display> FieldChange<V> {
    pub fn into_event(self, subject_id: impl Into<String>, event_type: impl Into<String>) -> AuditEvent {
        AuditEvent::new(
            subject_id,
            event_type,
            BTreeMap::from([(self.field.clone(), self.before.to_string())]),
            BTreeMap::from([(self.field, self.after.to_string())]),
        )
    }
}

/// Captures one value of a subject before and after a workflow step.
///
/// The accessor decides what is observed: a status, an assignee, a whole
/// flattened entity.
pub struct FieldChangeObserver<T, V> {
    field: String,
    accessor: Box<dyn Fn(&T) -> V + Send + Sync>,
    before: Option<V>,
}

impl<T, V: PartialEq> FieldChangeObserver<T, V> {
    pub fn new(field: impl Into<String>, accessor: impl Fn(&T) -> V + Send + Sync + 'static) -> Self {
        Self {
            field: field.into(),
            accessor: Box::new(accessor),
            before: None,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn capture_before(&mut self, subject: &T) {
        self.before = Some((self.accessor)(subject));
    }

    /// `None` when the value is unchanged or nothing was captured before.
    pub fn finish(&mut self, subject: &T) -> Option<FieldChange<V>> {
        let Some(before) = self.before.take() else {
            warn!(field = %self.field, "finish called without a captured before state");
            return None;
        };

        let after = (self.accessor)(subject);
        if before == after {
            debug!(field = %self.field, "No change observed");
            return None;
        }

        Some(FieldChange {
            field: self.field.clone(),
            before,
            after,
        })
    }
}

impl<T, V: PartialEq + fmt::Display> FieldChangeObserver<T, V> {
    /// Publish the change, if any. Returns whether an event was emitted.
    pub fn finish_and_publish(
        &mut self,
        subject: &T,
        subject_id: &str,
        event_type: &str,
        publisher: &dyn AuditPublisher,
    ) -> Result<bool> {
        match self.finish(subject) {
            Some(change) => {
                publisher.publish(change.into_event(subject_id, event_type))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Whole-entity observer: flattened snapshot before and after, diffed.
pub struct EntityChangeObserver {
    inner: FieldChangeObserver<DynamicEntity, FlatMap>,
}

impl EntityChangeObserver {
    pub fn new() -> Self {
        Self {
            inner: FieldChangeObserver::new("entity", flatten_excluding_computed),
        }
    }

    pub fn capture_before(&mut self, entity: &DynamicEntity) {
        self.inner.capture_before(entity);
    }

    /// Empty diff when nothing changed.
    pub fn finish(&mut self, entity: &DynamicEntity) -> EntityDiff {
        self.inner
            .finish(entity)
            .map(|change| diff(&change.before, &change.after))
            .unwrap_or_default()
    }

    pub fn finish_and_publish(
        &mut self,
        entity: &DynamicEntity,
        subject_id: &str,
        event_type: &str,
        publisher: &dyn AuditPublisher,
    ) -> Result<bool> {
        let changes = self.finish(entity);
        if changes.is_empty() {
            return Ok(false);
        }
        publisher.publish(AuditEvent::new(subject_id, event_type, changes.before, changes.after))?;
        Ok(true)
    }
}

impl Default for EntityChangeObserver {
    fn default() -> Self {
        Self::new()
    }
}
