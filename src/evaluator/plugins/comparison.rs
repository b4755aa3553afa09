use super::super::{EvaluationContext, ExprValue, ExpressionEvaluator, Scope};
use crate::core::{Result, SchemaError};
use crate::parser::ast::{BinaryOp, Expr};
use std::cmp::Ordering;

pub struct ComparisonEvaluator;

impl ExpressionEvaluator for ComparisonEvaluator {
    fn name(&self) -> &'static str {
        "COMPARISON"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        if let Expr::BinaryOp { op, .. } = expr {
            op.is_comparison()
        } else {
            false
        }
    }

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        context: &EvaluationContext<'_>,
    ) -> Result<ExprValue> {
        let Expr::BinaryOp { left, op, right } = expr else {
            unreachable!();
        };

        let left_val = context.evaluate(left, scope)?;
        let right_val = context.evaluate(right, scope)?;

        let result = self.compare(&left_val, &right_val, *op)?;
        Ok(ExprValue::Boolean(result))
    }
}

impl ComparisonEvaluator {
    /// Equality never fails: values of different kinds are simply unequal.
    /// Ordering against `null` is false; ordering across kinds is an error.
    pub fn compare(&self, left: &ExprValue, right: &ExprValue, op: BinaryOp) -> Result<bool> {
        if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            let equal = matches!(self.ordering(left, right), Some(Ordering::Equal))
                || (left.is_null() && right.is_null())
                || (!is_ordered(left) && left == right);
            return Ok(if op == BinaryOp::Eq { equal } else { !equal });
        }

        if left.is_null() || right.is_null() {
            return Ok(false);
        }

        let ordering = self.ordering(left, right).ok_or_else(|| {
            SchemaError::ExpressionEvaluation(format!(
                "Cannot compare {} {} {}",
                left.type_name(),
                op.symbol(),
                right.type_name()
            ))
        })?;

        Ok(match op {
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::GtEq => ordering != Ordering::Less,
            _ => unreachable!(),
        })
    }

    fn ordering(&self, left: &ExprValue, right: &ExprValue) -> Option<Ordering> {
        match (left, right) {
            (ExprValue::String(a), ExprValue::String(b)) => Some(a.cmp(b)),
            (ExprValue::Boolean(a), ExprValue::Boolean(b)) => Some(a.cmp(b)),
            (ExprValue::Time(a), ExprValue::Time(b)) => Some(a.cmp(b)),
            (ExprValue::Date(_), _) | (_, ExprValue::Date(_)) => {
                Some(left.as_date()?.cmp(&right.as_date()?))
            }
            _ => Some(left.as_decimal()?.cmp(&right.as_decimal()?)),
        }
    }
}

fn is_ordered(value: &ExprValue) -> bool {
    !matches!(value, ExprValue::List(_) | ExprValue::Object(_) | ExprValue::Null)
}
