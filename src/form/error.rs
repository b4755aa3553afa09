use serde::{Deserialize, Serialize};
use std::fmt;

/// One failed constraint against one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorItem {
    pub control_key: String,
    pub error_kind: String,
    pub error_message: String,
}

impl ValidationErrorItem {
    pub fn new(
        control_key: impl Into<String>,
        error_kind: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            control_key: control_key.into(),
            error_kind: error_kind.into(),
            error_message: error_message.into(),
        }
    }
}

impl fmt::Display for ValidationErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.control_key, self.error_kind, self.error_message)
    }
}
