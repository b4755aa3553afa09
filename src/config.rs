use crate::core::Result;
use crate::evaluator::DEFAULT_MAX_DEPTH;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Validation and expression evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Fixed reference date for relative date bounds and date functions.
    /// `None` uses the local calendar date at evaluation time.
    pub today: Option<NaiveDate>,

    /// Maximum nesting of a conditional expression, enforced both when it is
    /// parsed and when it is evaluated
    pub max_expression_depth: usize,

    /// Whether a failed conditional expression adds an `expression` error item
    pub emit_expression_errors: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            today: None,
            max_expression_depth: DEFAULT_MAX_DEPTH,
            emit_expression_errors: true,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the reference date
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Set the expression nesting limit
    pub fn max_expression_depth(mut self, depth: usize) -> Self {
        self.max_expression_depth = depth;
        self
    }

    pub fn emit_expression_errors(mut self, emit: bool) -> Self {
        self.emit_expression_errors = emit;
        self
    }

    /// Parse from a JSON object; missing keys keep their defaults
    ///
    /// ```
    /// # use caseschema::ValidatorConfig;
    /// let config = ValidatorConfig::from_json(r#"{ "today": "2026-01-31" }"#).unwrap();
    /// assert_eq!(config.max_expression_depth, 64);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}
