use super::{ComputedAttribute, Schema, SchemaDocument};
use crate::core::{Attribute, Result, SchemaError};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// One arena slot: every published version of a key plus its graph edges.
#[derive(Debug, Default)]
pub(super) struct SchemaNode {
    pub(super) versions: Vec<Arc<Schema>>,
    /// Indices of schemas this schema embeds.
    pub(super) children: Vec<usize>,
    /// Indices of schemas embedding this schema.
    pub(super) parents: Vec<usize>,
}

impl SchemaNode {
    fn current(&self) -> &Arc<Schema> {
        // a node is only created together with its first version
        &self.versions[self.versions.len() - 1]
    }
}

/// Arena of published schemas with index-based parent/child edge lists.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    pub(super) nodes: Vec<SchemaNode>,
    pub(super) index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the first version of a schema.
    ///
    /// Fails with `DuplicateKey` if the key is taken, `UnknownChildSchema` if
    /// an explicit child key or an embedded entity type names an undefined
    /// schema, and `DuplicateAttributeName` if stored or computed attribute
    /// names collide.
    pub fn define_schema(
        &mut self,
        key: impl Into<String>,
        attributes: Vec<Attribute>,
        computed_attributes: Vec<ComputedAttribute>,
        child_schema_keys: Vec<String>,
    ) -> Result<Arc<Schema>> {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(SchemaError::DuplicateKey(key));
        }

        let schema = self.build(
            key.clone(),
            key.clone(),
            String::new(),
            1,
            attributes,
            computed_attributes,
            child_schema_keys,
        )?;
        Ok(self.insert_new(schema))
    }

    /// Publishes a new version of an existing key. Entities built from the
    /// previous version keep their `Arc` and are unaffected.
    pub fn redefine_schema(
        &mut self,
        key: &str,
        attributes: Vec<Attribute>,
        computed_attributes: Vec<ComputedAttribute>,
        child_schema_keys: Vec<String>,
    ) -> Result<Arc<Schema>> {
        let idx = self.index_of(key)?;
        let previous = Arc::clone(self.nodes[idx].current());

        let schema = self.build(
            key.to_string(),
            previous.name.clone(),
            previous.description.clone(),
            previous.version + 1,
            attributes,
            computed_attributes,
            child_schema_keys,
        )?;
        Ok(self.insert_version(idx, schema))
    }

    /// Defines (or redefines, when the key already exists) a schema from its
    /// stored document form.
    pub fn publish(&mut self, document: SchemaDocument) -> Result<Arc<Schema>> {
        let computed = document
            .computed_attributes
            .iter()
            .map(|c| ComputedAttribute::new(&c.name, c.attr_type.clone(), &c.expression))
            .collect::<Result<Vec<_>>>()?;

        let version = match self.index.get(&document.key) {
            Some(&idx) => self.nodes[idx].current().version + 1,
            None => 1,
        };

        let schema = self.build(
            document.key.clone(),
            document.name.unwrap_or_else(|| document.key.clone()),
            document.description.unwrap_or_default(),
            version,
            document.attributes,
            computed,
            document.child_schema_keys,
        )?;

        Ok(match self.index.get(&document.key) {
            Some(&idx) => self.insert_version(idx, schema),
            None => self.insert_new(schema),
        })
    }

    /// Adds an explicit embedding edge between two published schemas.
    pub fn link_parent(&mut self, parent_key: &str, child_key: &str) -> Result<()> {
        let parent = self.index_of(parent_key)?;
        let child = self.index_of(child_key)?;
        self.add_edge(parent, child);
        Ok(())
    }

    /// Latest published version of a key.
    pub fn get(&self, key: &str) -> Result<Arc<Schema>> {
        let idx = self.index_of(key)?;
        Ok(Arc::clone(self.nodes[idx].current()))
    }

    pub fn get_version(&self, key: &str, version: u32) -> Option<Arc<Schema>> {
        let idx = *self.index.get(key)?;
        self.nodes[idx]
            .versions
            .iter()
            .find(|schema| schema.version == version)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Schema bound to a nested-entity attribute (or a list of nested
    /// entities): the child version `schema` was published against. Fails
    /// with `NotNestedEntity` for any other attribute kind.
    pub fn resolve_child_schema(&self, schema: &Schema, attribute_name: &str) -> Result<Arc<Schema>> {
        let attribute = schema.attribute(attribute_name).ok_or_else(|| {
            SchemaError::UnknownAttribute(attribute_name.to_string(), schema.key.clone())
        })?;

        let child_key = attribute.attr_type.embedded_schema_key().ok_or_else(|| {
            SchemaError::NotNestedEntity(attribute_name.to_string(), schema.key.clone())
        })?;

        schema.child_schema(child_key).cloned()
    }

    pub(super) fn index_of(&self, key: &str) -> Result<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| SchemaError::SchemaNotFound(key.to_string()))
    }

    pub(super) fn key_at(&self, idx: usize) -> &str {
        &self.nodes[idx].current().key
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        key: String,
        name: String,
        description: String,
        version: u32,
        attributes: Vec<Attribute>,
        computed_attributes: Vec<ComputedAttribute>,
        child_schema_keys: Vec<String>,
    ) -> Result<Schema> {
        let mut seen = HashSet::new();
        let names = attributes
            .iter()
            .map(|attr| &attr.name)
            .chain(computed_attributes.iter().map(|attr| &attr.name));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateAttributeName(name.clone(), key));
            }
        }

        let mut children: BTreeSet<String> = child_schema_keys.into_iter().collect();
        children.extend(
            attributes
                .iter()
                .filter_map(|attr| attr.attr_type.embedded_schema_key())
                .map(str::to_string),
        );

        let mut child_schemas = BTreeMap::new();
        for child in &children {
            let Some(&idx) = self.index.get(child) else {
                return Err(SchemaError::UnknownChildSchema(key, child.clone()));
            };
            child_schemas.insert(child.clone(), Arc::clone(self.nodes[idx].current()));
        }

        Ok(Schema {
            key,
            name,
            description,
            version,
            attributes,
            computed_attributes,
            child_schema_keys: children,
            child_schemas,
        })
    }

    fn insert_new(&mut self, schema: Schema) -> Arc<Schema> {
        let idx = self.nodes.len();
        let schema = Arc::new(schema);

        self.index.insert(schema.key.clone(), idx);
        self.nodes.push(SchemaNode {
            versions: vec![Arc::clone(&schema)],
            children: Vec::new(),
            parents: Vec::new(),
        });
        self.connect_children(idx, &schema);

        debug!(schema = %schema.key, version = schema.version, "published schema");
        schema
    }

    fn insert_version(&mut self, idx: usize, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);

        for child in std::mem::take(&mut self.nodes[idx].children) {
            self.nodes[child].parents.retain(|&parent| parent != idx);
        }
        self.nodes[idx].versions.push(Arc::clone(&schema));
        self.connect_children(idx, &schema);

        debug!(schema = %schema.key, version = schema.version, "published new schema version");
        schema
    }

    fn connect_children(&mut self, idx: usize, schema: &Schema) {
        let children = schema
            .child_schema_keys
            .iter()
            .filter_map(|key| self.index.get(key).copied())
            .collect::<Vec<_>>();
        for child in children {
            self.add_edge(idx, child);
        }
    }

    fn add_edge(&mut self, parent: usize, child: usize) {
        if !self.nodes[parent].children.contains(&child) {
            self.nodes[parent].children.push(child);
        }
        if !self.nodes[child].parents.contains(&parent) {
            self.nodes[child].parents.push(parent);
        }
    }
}
