//! Stored JSON blob to typed value conversion

use super::DynamicEntity;
use crate::core::{AttributeType, DATE_FORMAT, DocumentRef, Result, SchemaError, TIME_FORMAT, Value};
use crate::schema::Schema;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Converts JSON values to typed [`Value`]s, driven by the declared type.
pub struct ValueConverter;

impl ValueConverter {
    /// Convert a single JSON value declared on `owner`. Nested entities are
    /// bound to `owner`'s child schema versions.
    pub fn convert(json_value: &JsonValue, expected_type: &AttributeType, owner: &Schema) -> Result<Value> {
        match (json_value, expected_type) {
            (JsonValue::Null, _) => Ok(Value::Null),

            (JsonValue::String(s), AttributeType::String) => Ok(Value::String(s.clone())),

            (JsonValue::Bool(b), AttributeType::Boolean) => Ok(Value::Boolean(*b)),

            (JsonValue::Number(n), AttributeType::Integer) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| mismatch(json_value, expected_type)),

            // Decimals keep their textual precision
            (JsonValue::Number(n), AttributeType::Decimal) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map(Value::Decimal)
                .map_err(|_| mismatch(json_value, expected_type)),
            (JsonValue::String(s), AttributeType::Decimal) => Decimal::from_str(s.trim())
                .map(Value::Decimal)
                .map_err(|_| mismatch(json_value, expected_type)),

            (JsonValue::String(s), AttributeType::Date) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| SchemaError::TypeMismatch(format!("Invalid date '{}': {}", s, e))),

            (JsonValue::String(s), AttributeType::Time) => NaiveTime::parse_from_str(s, TIME_FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Value::Time)
                .map_err(|e| SchemaError::TypeMismatch(format!("Invalid time '{}': {}", s, e))),

            (JsonValue::Array(items), AttributeType::List(inner)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = Self::convert(item, inner, owner)?;
                    if value.is_null() {
                        return Err(SchemaError::TypeMismatch(format!(
                            "null element in list of {}",
                            inner
                        )));
                    }
                    values.push(value);
                }
                Ok(Value::List(values))
            }

            (JsonValue::Object(_), AttributeType::Entity(key)) => {
                let schema = Arc::clone(owner.child_schema(key)?);
                Ok(Value::Entity(Box::new(Self::to_entity(schema, json_value)?)))
            }

            (JsonValue::Object(_), AttributeType::Document) => {
                let doc: DocumentRef = serde_json::from_value(json_value.clone())?;
                Ok(Value::Document(doc))
            }

            _ => Err(mismatch(json_value, expected_type)),
        }
    }

    /// Convert a JSON object into an entity of `schema`.
    ///
    /// Keys naming computed attributes are skipped. Keys the schema does not
    /// declare (left behind by an older schema version) are dropped with a
    /// warning.
    pub fn to_entity(schema: Arc<Schema>, json: &JsonValue) -> Result<DynamicEntity> {
        let obj = json.as_object().ok_or_else(|| {
            SchemaError::TypeMismatch(format!(
                "Expected JSON object for entity of schema '{}'",
                schema.key()
            ))
        })?;

        let mut entity = DynamicEntity::new(schema.clone());

        for (name, json_value) in obj {
            if schema.is_computed(name) {
                continue;
            }
            let Some(attribute) = schema.attribute(name) else {
                warn!(schema = schema.key(), attribute = %name, "Dropping undeclared attribute from stored blob");
                continue;
            };

            let value = Self::convert(json_value, &attribute.attr_type, &schema)?;
            entity.insert_checked(name.clone(), value);
        }

        Ok(entity)
    }
}

fn mismatch(json_value: &JsonValue, expected_type: &AttributeType) -> SchemaError {
    SchemaError::TypeMismatch(format!(
        "Cannot convert JSON {} to {}",
        json_value, expected_type
    ))
}
