//! Storage collaborator contracts.
//!
//! The core never owns a storage engine. Callers hand it documents and blobs
//! through these traits; [`memory`] holds map-backed implementations.

pub mod memory;

pub use memory::{InMemoryEntityStore, InMemoryFormStore, InMemorySchemaStore};

use crate::core::{Result, SchemaError};
use crate::entity::DynamicEntity;
use crate::form::FormConfiguration;
use crate::schema::{Schema, SchemaDocument, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Schema documents by key
pub trait SchemaStore: Send + Sync {
    /// Fails with `SchemaNotFound` for unknown keys
    fn load_schema(&self, key: &str) -> Result<SchemaDocument>;

    fn save_schema(&self, document: &SchemaDocument) -> Result<()>;

    fn schema_keys(&self) -> Result<Vec<String>>;
}

/// Entity blob as persisted, with the schema version it was written against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntity {
    pub schema_key: String,
    pub schema_version: u32,
    pub blob: serde_json::Value,
}

pub trait EntityStore: Send + Sync {
    fn load_blob(&self, id: &Uuid) -> Result<StoredEntity>;

    fn save_blob(&self, id: Uuid, stored: StoredEntity) -> Result<()>;

    /// Rebuild the entity against the schema version it was saved with.
    fn load_entity(&self, registry: &SchemaRegistry, id: &Uuid) -> Result<DynamicEntity> {
        let stored = self.load_blob(id)?;
        let schema = registry
            .get_version(&stored.schema_key, stored.schema_version)
            .ok_or_else(|| {
                SchemaError::SchemaNotFound(format!("{}@v{}", stored.schema_key, stored.schema_version))
            })?;
        DynamicEntity::from_json(schema, &stored.blob)
    }

    fn save_entity(&self, id: Uuid, entity: &DynamicEntity) -> Result<()> {
        self.save_blob(
            id,
            StoredEntity {
                schema_key: entity.schema().key().to_string(),
                schema_version: entity.schema().version(),
                blob: entity.to_json(),
            },
        )
    }
}

/// Form configurations by name
pub trait FormConfigurationStore: Send + Sync {
    fn load_form(&self, name: &str) -> Result<FormConfiguration>;

    fn save_form(&self, name: &str, form: &FormConfiguration) -> Result<()>;
}

impl SchemaRegistry {
    /// Publish `key` from `store`, loading every referenced child schema
    /// first. Schemas already in the registry are reused as-is.
    pub fn load_from_store(&mut self, store: &dyn SchemaStore, key: &str) -> Result<Arc<Schema>> {
        let mut loading = HashSet::new();
        self.load_recursive(store, key, &mut loading)
    }

    fn load_recursive(
        &mut self,
        store: &dyn SchemaStore,
        key: &str,
        loading: &mut HashSet<String>,
    ) -> Result<Arc<Schema>> {
        if self.contains(key) {
            return self.get(key);
        }
        if !loading.insert(key.to_string()) {
            return Err(SchemaError::InvalidConfiguration(format!(
                "Stored schema '{}' embeds itself through its child references",
                key
            )));
        }

        let document = store.load_schema(key)?;
        let referenced: Vec<String> = document
            .child_schema_keys
            .iter()
            .cloned()
            .chain(
                document
                    .attributes
                    .iter()
                    .filter_map(|attr| attr.attr_type.embedded_schema_key().map(str::to_string)),
            )
            .collect();

        for child in &referenced {
            self.load_recursive(store, child, loading)?;
        }

        debug!(schema = key, children = referenced.len(), "Loaded schema from store");
        let schema = self.publish(document)?;
        loading.remove(key);
        Ok(schema)
    }
}
