use super::{Result, SchemaError, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema attribute.
///
/// Serialized in schema documents as a compact string: `string`, `boolean`,
/// `integer`, `decimal`, `date`, `time`, `document`, `list<T>` or
/// `entity<SchemaKey>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeType {
    String,
    Boolean,
    Integer,
    Decimal,
    Date,
    Time,
    List(Box<AttributeType>),
    Entity(String),
    Document,
}

impl AttributeType {
    pub fn list_of(inner: AttributeType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn entity(schema_key: impl Into<String>) -> Self {
        Self::Entity(schema_key.into())
    }

    /// Exact type check. `Null` is accepted by every type; there is no
    /// coercion between textual and numeric values.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Decimal, Value::Decimal(_)) => true,
            (Self::Date, Value::Date(_)) => true,
            (Self::Time, Value::Time(_)) => true,
            (Self::Document, Value::Document(_)) => true,
            (Self::List(inner), Value::List(items)) => {
                items.iter().all(|item| !item.is_null() && inner.accepts(item))
            }
            (Self::Entity(key), Value::Entity(entity)) => entity.schema().key() == key,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Schema key of a nested-entity type, looking through one list level.
    pub fn embedded_schema_key(&self) -> Option<&str> {
        match self {
            Self::Entity(key) => Some(key),
            Self::List(inner) => inner.embedded_schema_key(),
            _ => None,
        }
    }

    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();

        if let Some(inner) = strip_generic(token, "list") {
            return Ok(Self::List(Box::new(Self::parse(inner)?)));
        }
        if let Some(base) = token.strip_suffix("[]") {
            return Ok(Self::List(Box::new(Self::parse(base)?)));
        }
        if let Some(key) = strip_generic(token, "entity") {
            let key = key.trim();
            if key.is_empty() {
                return Err(SchemaError::InvalidConfiguration(
                    "entity type requires a schema key".into(),
                ));
            }
            return Ok(Self::Entity(key.to_string()));
        }

        match token.to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "integer" | "int" | "long" => Ok(Self::Integer),
            "decimal" | "number" => Ok(Self::Decimal),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "document" | "document-reference" => Ok(Self::Document),
            other => Err(SchemaError::InvalidConfiguration(format!(
                "unknown attribute type '{}'",
                other
            ))),
        }
    }
}

fn strip_generic<'a>(token: &'a str, name: &str) -> Option<&'a str> {
    let rest = token.strip_prefix(name)?;
    rest.strip_prefix('<')?.strip_suffix('>')
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
            Self::List(inner) => write!(f, "list<{}>", inner),
            Self::Entity(key) => write!(f, "entity<{}>", key),
            Self::Document => write!(f, "document"),
        }
    }
}

impl TryFrom<String> for AttributeType {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AttributeType> for String {
    fn from(value: AttributeType) -> Self {
        value.to_string()
    }
}

/// A stored attribute of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if !self.attr_type.accepts(value) {
            return Err(SchemaError::TypeMismatch(format!(
                "Attribute '{}' expects type {}, got {}",
                self.name,
                self.attr_type,
                value.type_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for token in [
            "string",
            "integer",
            "list<decimal>",
            "entity<Address>",
            "list<entity<Person>>",
            "document",
        ] {
            let parsed = AttributeType::parse(token).unwrap();
            assert_eq!(parsed.to_string(), token);
        }
        assert_eq!(
            AttributeType::parse("int[]").unwrap(),
            AttributeType::list_of(AttributeType::Integer)
        );
    }

    #[test]
    fn rejects_unknown_type() {
        let err = AttributeType::parse("blob").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn accepts_is_exact() {
        assert!(AttributeType::Integer.accepts(&Value::Integer(3)));
        assert!(AttributeType::Integer.accepts(&Value::Null));
        assert!(!AttributeType::Integer.accepts(&Value::String("3".into())));
        assert!(!AttributeType::String.accepts(&Value::Integer(3)));
        assert!(!AttributeType::Decimal.accepts(&Value::Integer(3)));

        let ints = AttributeType::list_of(AttributeType::Integer);
        assert!(ints.accepts(&Value::List(vec![Value::Integer(1), Value::Integer(2)])));
        assert!(!ints.accepts(&Value::List(vec![Value::Integer(1), Value::Boolean(true)])));
    }
}
