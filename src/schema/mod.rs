//! Schema model: declarative, versioned descriptions of dynamic entity shapes.
//!
//! Schemas are published into a [`SchemaRegistry`], an arena of immutable
//! `Arc<Schema>` records linked by index-based parent/child edge lists.
//! Consumers keep the `Arc` they were handed; redefining a key publishes a
//! new version instead of mutating the old one.

mod document;
mod graph;
mod registry;

pub use document::{ComputedAttributeDocument, SchemaDocument};
pub use registry::SchemaRegistry;

use crate::core::{Attribute, AttributeType, Result, SchemaError};
use crate::parser::ast::Expr;
use crate::parser::parse_expression;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Derived attribute, evaluated on demand from sibling attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedAttribute {
    pub name: String,
    pub attr_type: AttributeType,
    expression: String,
    parsed: Expr,
}

impl ComputedAttribute {
    /// Fails with `ExpressionParse` if the expression is malformed.
    pub fn new(
        name: impl Into<String>,
        attr_type: AttributeType,
        expression: impl Into<String>,
    ) -> Result<Self> {
        let expression = expression.into();
        let parsed = parse_expression(&expression)?;
        Ok(Self {
            name: name.into(),
            attr_type,
            expression,
            parsed,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn parsed(&self) -> &Expr {
        &self.parsed
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    key: String,
    name: String,
    description: String,
    version: u32,
    attributes: Vec<Attribute>,
    computed_attributes: Vec<ComputedAttribute>,
    child_schema_keys: BTreeSet<String>,
    /// Child versions current when this version was published, by key
    child_schemas: BTreeMap<String, Arc<Schema>>,
}

impl Schema {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn computed_attributes(&self) -> &[ComputedAttribute] {
        &self.computed_attributes
    }

    /// Explicit child references plus every schema embedded by an attribute.
    pub fn child_schema_keys(&self) -> &BTreeSet<String> {
        &self.child_schema_keys
    }

    /// Child schema version this schema was published against. Nested
    /// entities of this schema are bound to it, whatever the registry's
    /// latest version of `key` is.
    pub fn child_schema(&self, key: &str) -> Result<&Arc<Schema>> {
        self.child_schemas
            .get(key)
            .ok_or_else(|| SchemaError::SchemaNotFound(key.to_string()))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn computed_attribute(&self, name: &str) -> Option<&ComputedAttribute> {
        self.computed_attributes.iter().find(|attr| attr.name == name)
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.computed_attribute(name).is_some()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}
