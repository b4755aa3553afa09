use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema '{0}' already exists")]
    DuplicateKey(String),

    #[error("Schema '{0}' not found")]
    SchemaNotFound(String),

    #[error("Schema '{0}' references unknown child schema '{1}'")]
    UnknownChildSchema(String, String),

    #[error("Attribute '{0}' is declared more than once in schema '{1}'")]
    DuplicateAttributeName(String, String),

    #[error("Attribute '{0}' in schema '{1}' is not a nested entity")]
    NotNestedEntity(String, String),

    #[error("Attribute '{0}' not found in schema '{1}'")]
    UnknownAttribute(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid attribute path '{0}'")]
    InvalidPath(String),

    #[error("Index {1} is out of bounds for list attribute '{0}'")]
    IndexOutOfBounds(String, usize),

    #[error("Computed attribute '{0}' cannot be set")]
    ComputedAttributeNotSettable(String),

    #[error("Expression parse error: {0}")]
    ExpressionParse(String),

    #[error("Expression evaluation error: {0}")]
    ExpressionEvaluation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl SchemaError {
    /// Malformed schema or form configuration data. These abort the operation
    /// that hit them and are never reported as validation items.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey(_)
                | Self::UnknownChildSchema(..)
                | Self::DuplicateAttributeName(..)
                | Self::ExpressionParse(_)
                | Self::InvalidConfiguration(_)
        )
    }

    /// Contract violations between a caller and a known schema.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAttribute(..)
                | Self::InvalidPath(_)
                | Self::TypeMismatch(_)
                | Self::IndexOutOfBounds(..)
                | Self::NotNestedEntity(..)
                | Self::ComputedAttributeNotSettable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SchemaError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
