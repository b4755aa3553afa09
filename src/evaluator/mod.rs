pub mod plugins;
mod value;

pub use value::{ExprValue, Scope};

use crate::core::{Result, SchemaError};
use crate::parser::ast::{Expr, Literal};
use chrono::NaiveDate;
use std::cell::Cell;
use tracing::debug;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A plugin able to evaluate one family of expression nodes.
pub trait ExpressionEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_evaluate(&self, expr: &Expr) -> bool;

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        context: &EvaluationContext<'_>,
    ) -> Result<ExprValue>;
}

/// Per-evaluation state: the plugin registry, the reference date used by
/// date functions, and the recursion guard.
pub struct EvaluationContext<'a> {
    registry: &'a EvaluatorRegistry,
    today: NaiveDate,
    max_depth: usize,
    depth: Cell<usize>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(registry: &'a EvaluatorRegistry, today: NaiveDate) -> Self {
        Self {
            registry,
            today,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: Cell::new(0),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn evaluate(&self, expr: &Expr, scope: &Scope) -> Result<ExprValue> {
        match expr {
            Expr::Literal(literal) => return Ok(literal_value(literal)),
            Expr::Identifier(name) => {
                return scope.get(name).cloned().ok_or_else(|| {
                    SchemaError::ExpressionEvaluation(format!("'{}' is not defined", name))
                });
            }
            _ => {}
        }

        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(SchemaError::ExpressionEvaluation(format!(
                "expression nesting exceeds {} levels",
                self.max_depth
            )));
        }

        let Some(evaluator) = self.registry.find_evaluator(expr) else {
            return Err(SchemaError::ExpressionEvaluation(format!(
                "No evaluator found for expression: {:?}",
                expr
            )));
        };

        self.depth.set(depth + 1);
        let result = evaluator.evaluate(expr, scope, self);
        self.depth.set(depth);
        result
    }

    /// Evaluates an expression that must produce a boolean. `null` counts as
    /// false; any other type is an error.
    pub fn evaluate_predicate(&self, expr: &Expr, scope: &Scope) -> Result<bool> {
        match self.evaluate(expr, scope)? {
            ExprValue::Boolean(b) => Ok(b),
            ExprValue::Null => Ok(false),
            other => Err(SchemaError::ExpressionEvaluation(format!(
                "expression must evaluate to a boolean, got {}",
                other.type_name()
            ))),
        }
    }
}

fn literal_value(literal: &Literal) -> ExprValue {
    match literal {
        Literal::Null => ExprValue::Null,
        Literal::Boolean(b) => ExprValue::Boolean(*b),
        Literal::Integer(i) => ExprValue::Integer(*i),
        Literal::Decimal(d) => ExprValue::Decimal(*d),
        Literal::String(s) => ExprValue::String(s.clone()),
    }
}

/// Registry of evaluator plugins.
pub struct EvaluatorRegistry {
    evaluators: Vec<Box<dyn ExpressionEvaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
        }
    }

    pub fn register(&mut self, evaluator: Box<dyn ExpressionEvaluator>) {
        debug!(evaluator = evaluator.name(), "registered expression evaluator");
        self.evaluators.push(evaluator);
    }

    pub fn with_default_evaluators() -> Self {
        use plugins::*;

        let mut registry = Self::new();

        registry.register(Box::new(member::MemberEvaluator));
        registry.register(Box::new(boolean::BooleanEvaluator));
        registry.register(Box::new(comparison::ComparisonEvaluator));
        registry.register(Box::new(arithmetic::ArithmeticEvaluator));
        registry.register(Box::new(function::FunctionEvaluator));

        registry
    }

    fn find_evaluator(&self, expr: &Expr) -> Option<&dyn ExpressionEvaluator> {
        self.evaluators
            .iter()
            .find(|ev| ev.can_evaluate(expr))
            .map(|boxed| &**boxed)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_default_evaluators()
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_REGISTRY: EvaluatorRegistry = EvaluatorRegistry::with_default_evaluators();
}

/// Shared registry with the built-in plugins.
pub fn default_registry() -> &'static EvaluatorRegistry {
    &DEFAULT_REGISTRY
}
