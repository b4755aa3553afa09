use super::{ComputedAttribute, Schema, SchemaRegistry};
use crate::core::{Attribute, AttributeType, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storable JSON form of a schema, exchanged with the schema storage
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub computed_attributes: Vec<ComputedAttributeDocument>,
    #[serde(default)]
    pub child_schema_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedAttributeDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub expression: String,
}

impl SchemaDocument {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            description: None,
            version: None,
            attributes: Vec::new(),
            computed_attributes: Vec::new(),
            child_schema_keys: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attr_type: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, attr_type));
        self
    }

    pub fn computed(
        mut self,
        name: impl Into<String>,
        attr_type: AttributeType,
        expression: impl Into<String>,
    ) -> Self {
        self.computed_attributes.push(ComputedAttributeDocument {
            name: name.into(),
            attr_type,
            expression: expression.into(),
        });
        self
    }

    pub fn child(mut self, key: impl Into<String>) -> Self {
        self.child_schema_keys.push(key.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Schema {
    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            key: self.key.clone(),
            name: Some(self.name.clone()),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            version: Some(self.version),
            attributes: self.attributes.clone(),
            computed_attributes: self
                .computed_attributes
                .iter()
                .map(|c: &ComputedAttribute| ComputedAttributeDocument {
                    name: c.name.clone(),
                    attr_type: c.attr_type.clone(),
                    expression: c.expression().to_string(),
                })
                .collect(),
            child_schema_keys: self.child_schema_keys.iter().cloned().collect(),
        }
    }
}

impl SchemaRegistry {
    pub fn publish_json(&mut self, json: &str) -> Result<Arc<Schema>> {
        self.publish(SchemaDocument::from_json(json)?)
    }
}
