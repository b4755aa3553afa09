//! Named format validators referenced from a component's `validators` list.

use crate::core::{Result, SchemaError};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

lazy_static::lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();
    static ref PHONE: Regex = Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}[0-9]$").unwrap();
    static ref URL: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
    static ref POSTAL_CODE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,8}[A-Za-z0-9]$").unwrap();
    static ref NUMERIC: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// Format check over a string field value
pub trait FieldValidator: Send + Sync {
    /// Name used in configurations; also the reported `errorKind`
    fn name(&self) -> &str;

    fn is_valid(&self, value: &str) -> bool;

    fn message(&self) -> String {
        format!("Value is not a valid {}", self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailValidator;

impl FieldValidator for EmailValidator {
    fn name(&self) -> &str {
        "email"
    }

    fn is_valid(&self, value: &str) -> bool {
        EMAIL.is_match(value)
    }

    fn message(&self) -> String {
        "Value is not a valid email address".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhoneValidator;

impl FieldValidator for PhoneValidator {
    fn name(&self) -> &str {
        "phone"
    }

    fn is_valid(&self, value: &str) -> bool {
        let digits = value.chars().filter(char::is_ascii_digit).count();
        PHONE.is_match(value) && (7..=15).contains(&digits)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrlValidator;

impl FieldValidator for UrlValidator {
    fn name(&self) -> &str {
        "url"
    }

    fn is_valid(&self, value: &str) -> bool {
        URL.is_match(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostalCodeValidator;

impl FieldValidator for PostalCodeValidator {
    fn name(&self) -> &str {
        "postalCode"
    }

    fn is_valid(&self, value: &str) -> bool {
        POSTAL_CODE.is_match(value)
    }

    fn message(&self) -> String {
        "Value is not a valid postal code".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumericValidator;

impl FieldValidator for NumericValidator {
    fn name(&self) -> &str {
        "numeric"
    }

    fn is_valid(&self, value: &str) -> bool {
        NUMERIC.is_match(value)
    }

    fn message(&self) -> String {
        "Value must contain digits only".to_string()
    }
}

/// Lookup table of validators by name
pub struct ValidatorRegistry {
    validators: HashMap<String, Box<dyn FieldValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Later registrations replace earlier ones with the same name.
    pub fn register(&mut self, validator: Box<dyn FieldValidator>) {
        debug!(validator = validator.name(), "Registering field validator");
        self.validators.insert(validator.name().to_string(), validator);
    }

    pub fn with_default_validators() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EmailValidator));
        registry.register(Box::new(PhoneValidator));
        registry.register(Box::new(UrlValidator));
        registry.register(Box::new(PostalCodeValidator));
        registry.register(Box::new(NumericValidator));
        registry
    }

    /// Unknown names are configuration errors.
    pub fn get(&self, name: &str) -> Result<&dyn FieldValidator> {
        self.validators
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| SchemaError::InvalidConfiguration(format!("Unknown validator '{}'", name)))
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_default_validators()
    }
}
