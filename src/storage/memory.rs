use super::{EntityStore, FormConfigurationStore, SchemaStore, StoredEntity};
use crate::core::{Result, SchemaError};
use crate::form::FormConfiguration;
use crate::schema::SchemaDocument;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    documents: RwLock<HashMap<String, SchemaDocument>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn load_schema(&self, key: &str) -> Result<SchemaDocument> {
        self.documents
            .read()?
            .get(key)
            .cloned()
            .ok_or_else(|| SchemaError::SchemaNotFound(key.to_string()))
    }

    fn save_schema(&self, document: &SchemaDocument) -> Result<()> {
        self.documents
            .write()?
            .insert(document.key.clone(), document.clone());
        Ok(())
    }

    fn schema_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.documents.read()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    blobs: RwLock<HashMap<Uuid, StoredEntity>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.blobs.read()?.len())
    }
}

impl EntityStore for InMemoryEntityStore {
    fn load_blob(&self, id: &Uuid) -> Result<StoredEntity> {
        self.blobs
            .read()?
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(format!("entity {}", id)))
    }

    fn save_blob(&self, id: Uuid, stored: StoredEntity) -> Result<()> {
        self.blobs.write()?.insert(id, stored);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFormStore {
    forms: RwLock<HashMap<String, FormConfiguration>>,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormConfigurationStore for InMemoryFormStore {
    fn load_form(&self, name: &str) -> Result<FormConfiguration> {
        self.forms
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(format!("form configuration '{}'", name)))
    }

    fn save_form(&self, name: &str, form: &FormConfiguration) -> Result<()> {
        self.forms.write()?.insert(name.to_string(), form.clone());
        Ok(())
    }
}
