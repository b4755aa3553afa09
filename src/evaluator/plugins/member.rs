use super::super::{EvaluationContext, ExprValue, ExpressionEvaluator, Scope};
use crate::core::{Result, SchemaError};
use crate::parser::ast::Expr;

/// Property and index access over projected data.
///
/// A missing property of an object is `null`; reading through `null` is an
/// error, which is how missing intermediate data surfaces.
pub struct MemberEvaluator;

impl ExpressionEvaluator for MemberEvaluator {
    fn name(&self) -> &'static str {
        "MEMBER"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Member { .. } | Expr::Index { .. })
    }

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        context: &EvaluationContext<'_>,
    ) -> Result<ExprValue> {
        match expr {
            Expr::Member { object, property } => {
                let target = context.evaluate(object, scope)?;
                self.property(&target, property)
            }
            Expr::Index { object, index } => {
                let target = context.evaluate(object, scope)?;
                let index = context.evaluate(index, scope)?;
                self.index(&target, &index)
            }
            _ => unreachable!("MemberEvaluator called with {:?}", expr),
        }
    }
}

impl MemberEvaluator {
    fn property(&self, target: &ExprValue, property: &str) -> Result<ExprValue> {
        match target {
            ExprValue::Object(fields) => Ok(fields.get(property).cloned().unwrap_or(ExprValue::Null)),
            ExprValue::List(items) if property == "length" => Ok(ExprValue::Integer(items.len() as i64)),
            ExprValue::String(s) if property == "length" => {
                Ok(ExprValue::Integer(s.chars().count() as i64))
            }
            ExprValue::Null => Err(SchemaError::ExpressionEvaluation(format!(
                "cannot read property '{}' of null",
                property
            ))),
            other => Err(SchemaError::ExpressionEvaluation(format!(
                "cannot read property '{}' of {}",
                property,
                other.type_name()
            ))),
        }
    }

    fn index(&self, target: &ExprValue, index: &ExprValue) -> Result<ExprValue> {
        match (target, index) {
            (ExprValue::List(items), ExprValue::Integer(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(ExprValue::Null)),
            (ExprValue::Object(_), ExprValue::String(key)) => self.property(target, key),
            (ExprValue::Null, _) => Err(SchemaError::ExpressionEvaluation(format!(
                "cannot index null with {}",
                index
            ))),
            (other, index) => Err(SchemaError::ExpressionEvaluation(format!(
                "cannot index {} with {}",
                other.type_name(),
                index.type_name()
            ))),
        }
    }
}
