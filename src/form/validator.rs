use super::component::{ComponentProps, FormComponent, FormConfiguration};
use super::error::ValidationErrorItem;
use super::pattern::compile_pattern;
use super::relative_date::RelativeDate;
use super::validators::{FieldValidator, ValidatorRegistry};
use crate::config::ValidatorConfig;
use crate::core::{AttributeType, Result, SchemaError, Value};
use crate::entity::DynamicEntity;
use crate::evaluator::{EvaluationContext, Scope, default_registry};
use crate::parser::parse_expression_with_depth;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;
use tracing::{Level, debug, event, info_span, warn};

const HIDE_TARGETS: [&str; 2] = ["hide", "props.hidden"];
const REQUIRE_TARGETS: [&str; 2] = ["require", "props.required"];

/// Walks a form configuration tree and checks an entity against it.
///
/// Data problems are returned as [`ValidationErrorItem`]s; `Err` is reserved
/// for configuration errors such as unknown keys, malformed relative dates,
/// invalid patterns or unknown validator names. Component keys resolve
/// against the schema version the entity is bound to.
pub struct FormValidator {
    validators: ValidatorRegistry,
    config: ValidatorConfig,
}

impl FormValidator {
    pub fn new() -> Self {
        Self {
            validators: ValidatorRegistry::with_default_validators(),
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn FieldValidator>) -> Self {
        self.validators.register(validator);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate `entity` against every component of `form`, in declaration
    /// order. The entity is never modified.
    pub fn validate(
        &self,
        form: &FormConfiguration,
        entity: &DynamicEntity,
    ) -> Result<Vec<ValidationErrorItem>> {
        let span = info_span!(
            "form_validation",
            schema = %form.schema_key,
            components = form.components.len()
        );
        let _enter = span.enter();

        if form.schema_key != entity.schema().key() {
            return Err(SchemaError::InvalidConfiguration(format!(
                "Form targets schema '{}' but entity is bound to '{}'",
                form.schema_key,
                entity.schema().key()
            )));
        }

        let today = self.config.reference_date();
        let mut run = ValidationRun {
            validator: self,
            entity,
            scope: Scope::for_form(entity),
            context: EvaluationContext::new(default_registry(), today)
                .with_max_depth(self.config.max_expression_depth),
            today,
            errors: Vec::new(),
        };

        for component in &form.components {
            run.walk(component, "")?;
        }

        event!(Level::INFO, errors = run.errors.len(), "Form validation finished");
        Ok(run.errors)
    }
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call state of one validation pass.
struct ValidationRun<'v> {
    validator: &'v FormValidator,
    entity: &'v DynamicEntity,
    scope: Scope,
    context: EvaluationContext<'static>,
    today: NaiveDate,
    errors: Vec<ValidationErrorItem>,
}

/// Constraints of one component after expression overrides, with every
/// configuration-level input already parsed.
struct ResolvedConstraints<'v> {
    props: ComponentProps,
    relative_min: Option<NaiveDate>,
    relative_max: Option<NaiveDate>,
    pattern: Option<Arc<Regex>>,
    validators: Vec<&'v dyn FieldValidator>,
}

impl<'v> ValidationRun<'v> {
    fn walk(&mut self, component: &FormComponent, prefix: &str) -> Result<()> {
        let control_key = component.key.as_ref().map(|key| format!("{}{}", prefix, key));

        // Expression phase: overrides apply to a transient copy of the props
        let mut props = component.props.clone();
        let mut validator_names = component.validators.clone();
        let mut hide = props.hidden;
        let mut require = false;

        for (target, expression) in &component.expressions {
            let target = target.as_str();
            if HIDE_TARGETS.contains(&target) {
                hide |= self.condition(expression, control_key.as_deref());
            } else if REQUIRE_TARGETS.contains(&target) {
                require |= self.condition(expression, control_key.as_deref());
            } else {
                debug!(expression_target = target, "Ignoring expression with unsupported target");
            }
        }

        if require {
            props.required = true;
        }
        if hide {
            props.clear_constraints();
            validator_names.clear();
        }

        let mut bound = None;
        if let Some(key) = &control_key {
            let declared = self.entity.attribute_type(key).map_err(|err| {
                SchemaError::InvalidConfiguration(format!(
                    "Component key '{}' does not resolve against schema '{}' v{}: {}",
                    key,
                    self.entity.schema().key(),
                    self.entity.schema().version(),
                    err
                ))
            })?;
            let constraints = self.resolve_constraints(props, &validator_names)?;
            // hidden components have no constraints left to check
            let value = if hide { Value::Null } else { self.value_of(key)? };
            self.check(key, &declared, &value, &constraints);
            bound = Some((declared, value));
        }

        if hide {
            return Ok(());
        }

        match (&control_key, &bound) {
            (Some(key), Some((AttributeType::Entity(_), _))) => {
                let nested = format!("{}.", key);
                for child in &component.children {
                    self.walk(child, &nested)?;
                }
            }
            (Some(key), Some((AttributeType::List(inner), value))) if matches!(**inner, AttributeType::Entity(_)) => {
                let len = value.as_list().map_or(0, |items| items.len());
                for idx in 0..len {
                    let nested = format!("{}[{}].", key, idx);
                    for child in &component.children {
                        self.walk(child, &nested)?;
                    }
                }
            }
            _ => {
                for child in &component.children {
                    self.walk(child, prefix)?;
                }
            }
        }

        Ok(())
    }

    /// Evaluate a conditional expression. Failures count as `false` and are
    /// reported as an `expression` item.
    fn condition(&mut self, expression: &str, control_key: Option<&str>) -> bool {
        let config = &self.validator.config;
        let outcome = parse_expression_with_depth(expression, config.max_expression_depth)
            .and_then(|expr| self.context.evaluate_predicate(&expr, &self.scope));

        match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Expression evaluation degraded to false");
                self.expression_failed(control_key.unwrap_or_default(), &err);
                false
            }
        }
    }

    /// Bound value of a component. A computed attribute whose expression
    /// fails reads as absent and is reported as an `expression` item.
    fn value_of(&mut self, key: &str) -> Result<Value> {
        match self.entity.get_with(key, &self.validator.config) {
            Err(err @ SchemaError::ExpressionEvaluation(_)) => {
                warn!(control = key, error = %err, "Computed value degraded to absent");
                self.expression_failed(key, &err);
                Ok(Value::Null)
            }
            other => other,
        }
    }

    fn expression_failed(&mut self, control_key: &str, err: &SchemaError) {
        if self.validator.config.emit_expression_errors {
            self.errors
                .push(ValidationErrorItem::new(control_key, "expression", err.to_string()));
        }
    }

    fn resolve_constraints(
        &self,
        props: ComponentProps,
        validator_names: &[String],
    ) -> Result<ResolvedConstraints<'v>> {
        let relative = |spec: &Option<String>| -> Result<Option<NaiveDate>> {
            spec.as_deref()
                .map(|s| s.parse::<RelativeDate>()?.resolve(self.today))
                .transpose()
        };

        let relative_min = relative(&props.relative_min_date)?;
        let relative_max = relative(&props.relative_max_date)?;
        let pattern = props
            .pattern
            .as_deref()
            .map(compile_pattern)
            .transpose()?;
        let validators = validator_names
            .iter()
            .map(|name| self.validator.validators.get(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedConstraints {
            props,
            relative_min,
            relative_max,
            pattern,
            validators,
        })
    }

    /// Constraint phase. Every failing check adds its own item.
    fn check(
        &mut self,
        key: &str,
        attr_type: &AttributeType,
        value: &Value,
        constraints: &ResolvedConstraints<'_>,
    ) {
        let props = &constraints.props;

        if value.is_absent() {
            if props.required {
                self.fail(key, "required", props, || "This field is required".to_string());
            }
            return;
        }

        if attr_type.is_numeric() {
            if let Some(number) = value.as_decimal() {
                if let Some(min) = props.min {
                    if number < min {
                        self.fail(key, "min", props, || format!("Value must be at least {}", min.normalize()));
                    }
                }
                if let Some(max) = props.max {
                    if number > max {
                        self.fail(key, "max", props, || format!("Value must be at most {}", max.normalize()));
                    }
                }
            }
        }

        if let (AttributeType::Date, Some(date)) = (attr_type, value.as_date()) {
            let bounds = [
                ("minDate", props.min_date, false),
                ("maxDate", props.max_date, true),
                ("relativeMinDate", constraints.relative_min, false),
                ("relativeMaxDate", constraints.relative_max, true),
            ];
            for (kind, bound, is_max) in bounds {
                let Some(bound) = bound else { continue };
                let violated = if is_max { date > bound } else { date < bound };
                if violated {
                    let relation = if is_max { "on or before" } else { "on or after" };
                    self.fail(key, kind, props, || format!("Date must be {} {}", relation, bound));
                }
            }
        }

        if let (true, Some(text)) = (attr_type.is_string(), value.as_str()) {
            let length = text.chars().count();
            if let Some(min_length) = props.min_length {
                if length < min_length {
                    self.fail(key, "minLength", props, || {
                        format!("Value must be at least {} characters", min_length)
                    });
                }
            }
            if let Some(max_length) = props.max_length {
                if length > max_length {
                    self.fail(key, "maxLength", props, || {
                        format!("Value must be at most {} characters", max_length)
                    });
                }
            }
            if let Some(pattern) = &constraints.pattern {
                if !pattern.is_match(text) {
                    self.fail(key, "pattern", props, || "Value has an invalid format".to_string());
                }
            }
            if !props.options.is_empty() && !props.options.iter().any(|opt| opt.key == text) {
                self.fail(key, "selectOptions", props, || {
                    format!("'{}' is not one of the available options", text)
                });
            }
            for validator in &constraints.validators {
                if !validator.is_valid(text) {
                    self.fail(key, validator.name(), props, || validator.message());
                }
            }
        }
    }

    fn fail(
        &mut self,
        key: &str,
        kind: &str,
        props: &ComponentProps,
        default_message: impl FnOnce() -> String,
    ) {
        let message = props.error_label.clone().unwrap_or_else(default_message);
        debug!(control = key, kind, "Constraint failed");
        self.errors.push(ValidationErrorItem::new(key, kind, message));
    }
}
