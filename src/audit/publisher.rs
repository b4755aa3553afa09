use crate::core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// Structured change record handed to the audit transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub subject_id: String,
    pub event_type: String,
    pub before: BTreeMap<String, String>,
    pub after: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        subject_id: impl Into<String>,
        event_type: impl Into<String>,
        before: BTreeMap<String, String>,
        after: BTreeMap<String, String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            event_type: event_type.into(),
            before,
            after,
            recorded_at: Utc::now(),
        }
    }
}

/// Outbound audit transport. The core never formats or sends events itself.
pub trait AuditPublisher: Send + Sync {
    fn publish(&self, event: AuditEvent) -> Result<()>;
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditPublisher {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.events.lock()?.clone())
    }
}

impl AuditPublisher for InMemoryAuditPublisher {
    fn publish(&self, event: AuditEvent) -> Result<()> {
        debug!(subject = %event.subject_id, event_type = %event.event_type, "Audit event published");
        self.events.lock()?.push(event);
        Ok(())
    }
}
