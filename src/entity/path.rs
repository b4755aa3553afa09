use crate::core::{AttributeType, Result, SchemaError};
use crate::schema::Schema;
use std::fmt;

/// One step of a dotted attribute path: `name` or `name[index]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<usize>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(idx) => write!(f, "{}[{}]", self.name, idx),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Split `a.b[2].c` into segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let invalid = || SchemaError::InvalidPath(path.to_string());

    if path.trim().is_empty() {
        return Err(invalid());
    }

    path.split('.')
        .map(|raw| {
            let raw = raw.trim();
            let (name, index) = match raw.find('[') {
                Some(open) => {
                    let close = raw.strip_suffix(']').ok_or_else(invalid)?;
                    let idx = close[open + 1..].parse::<usize>().map_err(|_| invalid())?;
                    (&raw[..open], Some(idx))
                }
                None => (raw, None),
            };

            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid());
            }

            Ok(PathSegment {
                name: name.to_string(),
                index,
            })
        })
        .collect()
}

/// Join segments back into their textual form.
pub fn join_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|seg| seg.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Declared type at the end of `path` within `schema`, descending through
/// the child schema versions `schema` was published against. An indexed
/// segment yields the list's element type.
pub fn resolve_type(schema: &Schema, path: &str) -> Result<AttributeType> {
    segments_type(schema, &parse_path(path)?)
}

pub(crate) fn segments_type(schema: &Schema, segments: &[PathSegment]) -> Result<AttributeType> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(SchemaError::InvalidPath(String::new()));
    };
    let declared = element_type(schema, segment, declared_type(schema, segment)?)?;

    if rest.is_empty() {
        return Ok(declared);
    }
    match &declared {
        AttributeType::Entity(key) => segments_type(schema.child_schema(key)?, rest),
        _ => Err(not_nested(schema, segment)),
    }
}

/// Declared type of one segment's attribute, computed attributes included.
pub(crate) fn declared_type(schema: &Schema, segment: &PathSegment) -> Result<AttributeType> {
    if let Some(attribute) = schema.attribute(&segment.name) {
        return Ok(attribute.attr_type.clone());
    }
    if let Some(computed) = schema.computed_attribute(&segment.name) {
        return Ok(computed.attr_type.clone());
    }
    Err(SchemaError::UnknownAttribute(
        segment.name.clone(),
        schema.key().to_string(),
    ))
}

/// Apply the segment's index, if any, to a declared type.
pub(crate) fn element_type(
    schema: &Schema,
    segment: &PathSegment,
    declared: AttributeType,
) -> Result<AttributeType> {
    match (segment.index, declared) {
        (None, declared) => Ok(declared),
        (Some(_), AttributeType::List(inner)) => Ok(*inner),
        (Some(_), other) => Err(SchemaError::TypeMismatch(format!(
            "'{}' in schema '{}' is {}, not a list",
            segment.name,
            schema.key(),
            other
        ))),
    }
}

pub(crate) fn not_nested(schema: &Schema, segment: &PathSegment) -> SchemaError {
    SchemaError::TypeMismatch(format!(
        "'{}' in schema '{}' is not a nested entity",
        segment,
        schema.key()
    ))
}
