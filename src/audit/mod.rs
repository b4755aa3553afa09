//! Audit support: before/after snapshots of dynamic entities reduced to the
//! attributes that actually changed.

mod diff;
mod observer;
mod publisher;

pub use diff::{EntityDiff, FlatMap, diff, diff_entities, flatten_excluding_computed};
pub use observer::{EntityChangeObserver, FieldChange, FieldChangeObserver};
pub use publisher::{AuditEvent, AuditPublisher, InMemoryAuditPublisher};
