use crate::core::Value;
use crate::entity::DynamicEntity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info_span};

pub type FlatMap = BTreeMap<String, String>;

/// Remaining entries after [`diff`]: only genuinely changed, added or
/// removed attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDiff {
    pub before: FlatMap,
    pub after: FlatMap,
}

impl EntityDiff {
    /// No changes; nothing to record.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Keys present only after the change
    pub fn added(&self) -> impl Iterator<Item = (&str, &str)> {
        self.after
            .iter()
            .filter(|(key, _)| !self.before.contains_key(*key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Keys present only before the change
    pub fn removed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.before
            .iter()
            .filter(|(key, _)| !self.after.contains_key(*key))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// `(key, before, after)` for keys whose value changed
    pub fn changed(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.before.iter().filter_map(|(key, old)| {
            self.after
                .get(key)
                .map(|new| (key.as_str(), old.as_str(), new.as_str()))
        })
    }

    pub fn swapped(self) -> Self {
        Self {
            before: self.after,
            after: self.before,
        }
    }
}

/// [`DynamicEntity::flatten_to_map`] minus every computed attribute key,
/// nested ones included under their path prefix.
pub fn flatten_excluding_computed(entity: &DynamicEntity) -> FlatMap {
    let mut flat = entity.flatten_to_map();
    remove_computed(entity, "", &mut flat);
    flat
}

fn remove_computed(entity: &DynamicEntity, prefix: &str, flat: &mut FlatMap) {
    for computed in entity.schema().computed_attributes() {
        flat.remove(&format!("{}{}", prefix, computed.name));
    }
    for (name, value) in entity.stored_values() {
        if let Value::Entity(nested) = value {
            remove_computed(nested, &format!("{}{}.", prefix, name), flat);
        }
    }
}

/// Drop blank values and entries equal on both sides.
pub fn diff(before: &FlatMap, after: &FlatMap) -> EntityDiff {
    fn retain_changes(map: &FlatMap, other: &FlatMap) -> FlatMap {
        map.iter()
            .filter(|(key, value)| !value.trim().is_empty() && other.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    EntityDiff {
        before: retain_changes(before, after),
        after: retain_changes(after, before),
    }
}

/// Flatten both snapshots (computed attributes excluded) and diff them.
pub fn diff_entities(before: &DynamicEntity, after: &DynamicEntity) -> EntityDiff {
    let span = info_span!("entity_diff", schema = before.schema().key());
    let _enter = span.enter();

    let result = diff(
        &flatten_excluding_computed(before),
        &flatten_excluding_computed(after),
    );
    debug!(
        before = result.before.len(),
        after = result.after.len(),
        "Computed entity diff"
    );
    result
}
