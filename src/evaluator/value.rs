use crate::core::{AttributeType, DATE_FORMAT, Result, SchemaError, TIME_FORMAT, Value};
use crate::entity::DynamicEntity;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use std::fmt;

/// Value domain of the expression interpreter: a plain nested projection of
/// entity data.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    List(Vec<ExprValue>),
    Object(BTreeMap<String, ExprValue>),
}

impl ExprValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Decimal(d) => !d.is_zero(),
            Self::String(s) => !s.is_empty(),
            Self::Date(_) | Self::Time(_) | Self::List(_) | Self::Object(_) => true,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Dates may arrive as ISO strings from literals.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
            _ => None,
        }
    }

    /// Converts an evaluation result into a stored value of the declared type.
    /// Numeric results widen or narrow losslessly; ISO strings become dates
    /// and times.
    pub fn into_value(self, declared: &AttributeType) -> Result<Value> {
        let mismatch = |value: &ExprValue| {
            SchemaError::TypeMismatch(format!(
                "expression produced {} where {} was declared",
                value.type_name(),
                declared
            ))
        };

        match (declared, self) {
            (_, Self::Null) => Ok(Value::Null),
            (AttributeType::String, Self::String(s)) => Ok(Value::String(s)),
            (AttributeType::Boolean, Self::Boolean(b)) => Ok(Value::Boolean(b)),
            (AttributeType::Integer, Self::Integer(i)) => Ok(Value::Integer(i)),
            (AttributeType::Integer, Self::Decimal(d)) if d.fract().is_zero() => d
                .to_i64()
                .map(Value::Integer)
                .ok_or_else(|| mismatch(&Self::Decimal(d))),
            (AttributeType::Decimal, Self::Decimal(d)) => Ok(Value::Decimal(d)),
            (AttributeType::Decimal, Self::Integer(i)) => Ok(Value::Decimal(Decimal::from(i))),
            (AttributeType::Date, Self::Date(d)) => Ok(Value::Date(d)),
            (AttributeType::Date, Self::String(s)) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| mismatch(&Self::String(s))),
            (AttributeType::Time, Self::Time(t)) => Ok(Value::Time(t)),
            (AttributeType::Time, Self::String(s)) => NaiveTime::parse_from_str(&s, TIME_FORMAT)
                .map(Value::Time)
                .map_err(|_| mismatch(&Self::String(s))),
            (AttributeType::List(inner), Self::List(items)) => items
                .into_iter()
                .map(|item| item.into_value(inner))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (_, other) => Err(mismatch(&other)),
        }
    }
}

impl From<&Value> for ExprValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::String(s.clone()),
            Value::Boolean(b) => Self::Boolean(*b),
            Value::Integer(i) => Self::Integer(*i),
            Value::Decimal(d) => Self::Decimal(*d),
            Value::Date(d) => Self::Date(*d),
            Value::Time(t) => Self::Time(*t),
            Value::List(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Entity(entity) => Self::from(entity.as_ref()),
            Value::Document(doc) => {
                let mut fields = BTreeMap::new();
                fields.insert("documentId".into(), Self::String(doc.document_id.to_string()));
                fields.insert(
                    "originalFilename".into(),
                    Self::String(doc.original_filename.clone()),
                );
                Self::Object(fields)
            }
        }
    }
}

impl From<&DynamicEntity> for ExprValue {
    fn from(entity: &DynamicEntity) -> Self {
        Self::Object(
            entity
                .stored_values()
                .map(|(name, value)| (name.to_string(), Self::from(value)))
                .collect(),
        )
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d.normalize()),
            Self::String(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Self::List(items) => {
                let parts = items.iter().map(|item| item.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", parts.join(","))
            }
            Self::Object(_) => write!(f, "[object]"),
        }
    }
}

/// Variables visible to an expression.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: BTreeMap<String, ExprValue>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every declared attribute of the entity bound as a top-level variable;
    /// unset attributes are bound to `null`.
    pub fn from_entity(entity: &DynamicEntity) -> Self {
        let mut scope = Self::new();
        for attribute in entity.schema().attributes() {
            let value = entity
                .stored_value(&attribute.name)
                .map_or(ExprValue::Null, ExprValue::from);
            scope.bind(attribute.name.clone(), value);
        }
        scope
    }

    /// Form expressions address data through `model`; top-level attributes
    /// are also bound directly.
    pub fn for_form(entity: &DynamicEntity) -> Self {
        let mut scope = Self::from_entity(entity);
        scope.bind("model", ExprValue::from(entity));
        scope
    }

    pub fn bind(&mut self, name: impl Into<String>, value: ExprValue) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ExprValue> {
        self.variables.get(name)
    }
}
