use crate::core::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Component tree bound to one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfiguration {
    pub schema_key: String,
    #[serde(default)]
    pub components: Vec<FormComponent>,
}

impl FormConfiguration {
    pub fn new(schema_key: impl Into<String>, components: Vec<FormComponent>) -> Self {
        Self {
            schema_key: schema_key.into(),
            components,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One UI field descriptor. Components without a `key` are layout nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,

    #[serde(default, alias = "templateOptions")]
    pub props: ComponentProps,

    /// Named format validators, either `["email"]` or `{ "validation": ["email"] }`
    #[serde(default, deserialize_with = "validator_names")]
    pub validators: Vec<String>,

    /// Target (`hide`, `require`, `props.hidden`, `props.required`) to
    /// boolean expression
    #[serde(default, alias = "expressionProperties")]
    pub expressions: BTreeMap<String, String>,

    #[serde(default, alias = "fieldGroup")]
    pub children: Vec<FormComponent>,
}

impl FormComponent {
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn group(children: Vec<FormComponent>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    pub fn with_props(mut self, props: ComponentProps) -> Self {
        self.props = props;
        self
    }

    pub fn with_expression(mut self, target: impl Into<String>, expression: impl Into<String>) -> Self {
        self.expressions.insert(target.into(), expression.into());
        self
    }

    pub fn with_validator(mut self, name: impl Into<String>) -> Self {
        self.validators.push(name.into());
        self
    }

    pub fn with_children(mut self, children: Vec<FormComponent>) -> Self {
        self.children = children;
        self
    }

    /// Drop every constraint on this component and its whole subtree.
    pub fn clear_constraints(&mut self) {
        self.props.clear_constraints();
        self.validators.clear();
        for child in &mut self.children {
            child.clear_constraints();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    pub hidden: bool,

    #[serde(deserialize_with = "exact_decimal", skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    #[serde(deserialize_with = "exact_decimal", skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<NaiveDate>,

    /// `<±N>-<unit>`, unit one of day, week, month, year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_min_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_max_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(alias = "selectOptions", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,

    /// Message reported for every failed check on this component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_label: Option<String>,
}

impl ComponentProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: impl Into<Decimal>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<Decimal>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn relative_min_date(mut self, spec: impl Into<String>) -> Self {
        self.relative_min_date = Some(spec.into());
        self
    }

    pub fn relative_max_date(mut self, spec: impl Into<String>) -> Self {
        self.relative_max_date = Some(spec.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn clear_constraints(&mut self) {
        self.required = false;
        self.min = None;
        self.max = None;
        self.min_date = None;
        self.max_date = None;
        self.relative_min_date = None;
        self.relative_max_date = None;
        self.min_length = None;
        self.max_length = None;
        self.pattern = None;
        self.options.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(alias = "value")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SelectOption {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValidatorNames {
    List(Vec<String>),
    Wrapped {
        #[serde(default)]
        validation: Vec<String>,
    },
}

fn validator_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ValidatorNames::deserialize(deserializer)? {
        ValidatorNames::List(names) => names,
        ValidatorNames::Wrapped { validation } => validation,
    })
}

/// Numeric bounds accept JSON numbers or strings; both keep their exact text.
fn exact_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let text = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => return Err(D::Error::custom(format!("expected a number, got {}", other))),
    };

    Decimal::from_str(text.trim())
        .or_else(|_| Decimal::from_scientific(text.trim()))
        .map(Some)
        .map_err(D::Error::custom)
}
