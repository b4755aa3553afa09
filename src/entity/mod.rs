//! Runtime instances of a schema.
//!
//! A [`DynamicEntity`] is a name-keyed map of tagged [`Value`]s. The bound
//! [`Schema`] is consulted on every mutation; nothing is stored that the
//! schema does not declare with a matching type.

mod json;
pub mod path;

pub use json::ValueConverter;
pub use path::{PathSegment, parse_path, resolve_type};

use crate::config::ValidatorConfig;
use crate::core::{AttributeType, Result, SchemaError, Value};
use crate::evaluator::{EvaluationContext, ExprValue, Scope, default_registry};
use crate::schema::Schema;
use path::{declared_type, element_type, not_nested, segments_type};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Property bag conforming to one schema version.
///
/// Not synchronized: callers sharing an instance across threads must lock it
/// themselves.
#[derive(Debug, Clone)]
pub struct DynamicEntity {
    schema: Arc<Schema>,
    values: BTreeMap<String, Value>,
}

impl PartialEq for DynamicEntity {
    fn eq(&self, other: &Self) -> bool {
        self.schema.key() == other.schema.key()
            && self.schema.version() == other.schema.version()
            && self.values == other.values
    }
}

impl DynamicEntity {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Value stored directly under `name`, if any.
    pub fn stored_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Stored values in schema declaration order.
    pub fn stored_values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .attributes()
            .iter()
            .filter_map(|attr| self.values.get(&attr.name).map(|v| (attr.name.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve a dotted path such as `applicant.address.city` or
    /// `members[0].name`.
    ///
    /// Every segment is checked against the schemas along the path, even
    /// past an absent intermediate entity, which then yields `Value::Null`.
    /// A computed attribute at the end of the path is evaluated.
    pub fn get(&self, path: &str) -> Result<Value> {
        self.get_with(path, &ValidatorConfig::default())
    }

    /// Like [`DynamicEntity::get`], evaluating computed attributes under
    /// `config`.
    pub fn get_with(&self, path: &str, config: &ValidatorConfig) -> Result<Value> {
        let segments = parse_path(path)?;
        self.get_segments(&segments, config)
    }

    fn get_segments(&self, segments: &[PathSegment], config: &ValidatorConfig) -> Result<Value> {
        let Some((segment, rest)) = segments.split_first() else {
            return Err(SchemaError::InvalidPath(String::new()));
        };
        let declared = element_type(&self.schema, segment, declared_type(&self.schema, segment)?)?;

        if rest.is_empty() {
            if self.schema.is_computed(&segment.name) {
                let value = self.evaluate_computed_with(&segment.name, config)?;
                return Ok(match segment.index {
                    Some(idx) => value.as_list().and_then(|items| items.get(idx)).cloned().unwrap_or(Value::Null),
                    None => value,
                });
            }
            return Ok(self.indexed(segment).cloned().unwrap_or(Value::Null));
        }

        let AttributeType::Entity(child_key) = &declared else {
            return Err(not_nested(&self.schema, segment));
        };

        match self.indexed(segment) {
            Some(Value::Entity(nested)) => nested.get_segments(rest, config),
            _ => {
                segments_type(self.schema.child_schema(child_key)?, rest)?;
                Ok(Value::Null)
            }
        }
    }

    /// Declared type at the end of `path`, resolved against the schemas this
    /// entity and its present nested entities are bound to.
    pub fn attribute_type(&self, path: &str) -> Result<AttributeType> {
        self.type_of(&parse_path(path)?)
    }

    fn type_of(&self, segments: &[PathSegment]) -> Result<AttributeType> {
        let Some((segment, rest)) = segments.split_first() else {
            return Err(SchemaError::InvalidPath(String::new()));
        };
        if rest.is_empty() {
            return segments_type(&self.schema, segments);
        }

        match self.indexed(segment) {
            Some(Value::Entity(nested)) => nested.type_of(rest),
            _ => segments_type(&self.schema, segments),
        }
    }

    /// Store `value` at `path` after an exact type check against the
    /// declared attribute type.
    ///
    /// Every intermediate nested entity must already exist; use
    /// [`DynamicEntity::set_or_create`] to create missing ones. The whole
    /// path and the value are checked before an absent intermediate is
    /// reported. On error the entity is left unchanged.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = parse_path(path)?;
        self.set_segments(&segments, value.into(), false)
    }

    /// Like [`DynamicEntity::set`], creating absent intermediate entities
    /// bound to the child schema versions of their parents.
    pub fn set_or_create(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = parse_path(path)?;
        self.set_segments(&segments, value.into(), true)
    }

    fn set_segments(&mut self, segments: &[PathSegment], value: Value, create: bool) -> Result<()> {
        let Some((segment, rest)) = segments.split_first() else {
            return Err(SchemaError::InvalidPath(String::new()));
        };

        if self.schema.is_computed(&segment.name) {
            return Err(SchemaError::ComputedAttributeNotSettable(segment.name.clone()));
        }
        let attribute = self.schema.attribute(&segment.name).ok_or_else(|| {
            SchemaError::UnknownAttribute(segment.name.clone(), self.schema.key().to_string())
        })?;
        let declared = element_type(&self.schema, segment, attribute.attr_type.clone())?;

        if rest.is_empty() {
            if !declared.accepts(&value) || (segment.index.is_some() && value.is_null()) {
                return Err(SchemaError::TypeMismatch(format!(
                    "Attribute '{}' of schema '{}' expects type {}, got {}",
                    segment,
                    self.schema.key(),
                    declared,
                    value.type_name()
                )));
            }
            return self.store(segment, value);
        }

        let AttributeType::Entity(child_key) = &declared else {
            return Err(not_nested(&self.schema, segment));
        };

        if let Some(Value::Entity(nested)) = self.indexed_mut(segment) {
            return nested.set_segments(rest, value, create);
        }

        // the rest of the path is checked before the absent intermediate is reported
        let mut nested = DynamicEntity::new(Arc::clone(self.schema.child_schema(child_key)?));
        nested.set_segments(rest, value, create)?;
        if !create {
            return Err(SchemaError::TypeMismatch(format!(
                "Nested entity '{}' of schema '{}' is absent",
                segment,
                self.schema.key()
            )));
        }
        self.store(segment, Value::Entity(Box::new(nested)))
    }

    fn store(&mut self, segment: &PathSegment, value: Value) -> Result<()> {
        let Some(idx) = segment.index else {
            if value.is_null() {
                self.values.remove(&segment.name);
            } else {
                self.values.insert(segment.name.clone(), value);
            }
            return Ok(());
        };

        let len = match self.values.get(&segment.name) {
            Some(Value::List(items)) => items.len(),
            _ => 0,
        };
        if idx > len {
            return Err(SchemaError::IndexOutOfBounds(segment.name.clone(), idx));
        }

        let slot = self
            .values
            .entry(segment.name.clone())
            .or_insert_with(|| Value::List(Vec::new()));
        if slot.is_null() {
            *slot = Value::List(Vec::new());
        }
        if let Value::List(items) = slot {
            if idx == len {
                items.push(value);
            } else {
                items[idx] = value;
            }
        }
        Ok(())
    }

    fn indexed(&self, segment: &PathSegment) -> Option<&Value> {
        let value = self.values.get(&segment.name)?;
        match segment.index {
            None => Some(value),
            Some(idx) => value.as_list()?.get(idx),
        }
    }

    fn indexed_mut(&mut self, segment: &PathSegment) -> Option<&mut Value> {
        let value = self.values.get_mut(&segment.name)?;
        match (segment.index, value) {
            (None, value) => Some(value),
            (Some(idx), Value::List(items)) => items.get_mut(idx),
            (Some(_), _) => None,
        }
    }

    /// Evaluate a computed attribute against the current stored values.
    pub fn evaluate_computed(&self, name: &str) -> Result<Value> {
        self.evaluate_computed_with(name, &ValidatorConfig::default())
    }

    pub fn evaluate_computed_with(&self, name: &str, config: &ValidatorConfig) -> Result<Value> {
        let computed = self.schema.computed_attribute(name).ok_or_else(|| {
            SchemaError::UnknownAttribute(name.to_string(), self.schema.key().to_string())
        })?;

        let scope = Scope::from_entity(self);
        let context = EvaluationContext::new(default_registry(), config.reference_date())
            .with_max_depth(config.max_expression_depth);
        let result = context.evaluate(computed.parsed(), &scope)?;

        debug!(
            schema = self.schema.key(),
            attribute = name,
            result = %result,
            "Evaluated computed attribute"
        );
        result.into_value(&computed.attr_type).map_err(|err| {
            SchemaError::ExpressionEvaluation(format!("computed attribute '{}': {}", name, err))
        })
    }

    /// Every computed attribute of this entity's schema, by name.
    pub fn evaluate_all_computed(&self) -> Result<BTreeMap<String, Value>> {
        self.schema
            .computed_attributes()
            .iter()
            .map(|computed| Ok((computed.name.clone(), self.evaluate_computed(&computed.name)?)))
            .collect()
    }

    /// Path to stringified value for every stored leaf attribute. Nested
    /// entities are descended with `.`-joined prefixes; lists use their
    /// bracketed display form.
    pub fn flatten_to_map(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        for (name, value) in self.stored_values() {
            let key = format!("{}{}", prefix, name);
            match value {
                Value::Entity(nested) => nested.flatten_into(&format!("{}.", key), out),
                other => {
                    out.insert(key, other.to_string());
                }
            }
        }
    }

    /// Stored blob form. Computed attributes are never included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.stored_values()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }

    /// Plain nested mapping of the stored data, as seen by expressions.
    pub fn projection(&self) -> ExprValue {
        ExprValue::from(self)
    }

    /// Rebuild an entity from its stored blob. Nested entities are bound to
    /// the child schema versions of `schema`.
    pub fn from_json(schema: Arc<Schema>, json: &serde_json::Value) -> Result<Self> {
        ValueConverter::to_entity(schema, json)
    }

    pub fn from_json_str(schema: Arc<Schema>, json: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(schema, &json)
    }

    /// Insert without path parsing or schema checks. Callers have already
    /// validated the value.
    pub(crate) fn insert_checked(&mut self, name: String, value: Value) {
        if !value.is_null() {
            self.values.insert(name, value);
        }
    }
}
