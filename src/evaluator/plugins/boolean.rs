use super::super::{EvaluationContext, ExprValue, ExpressionEvaluator, Scope};
use crate::core::Result;
use crate::parser::ast::{BinaryOp, Expr};

/// `&&`, `||` (short-circuiting, truthiness based) and `!`.
pub struct BooleanEvaluator;

impl ExpressionEvaluator for BooleanEvaluator {
    fn name(&self) -> &'static str {
        "BOOLEAN"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        match expr {
            Expr::BinaryOp { op, .. } => op.is_logical(),
            Expr::Not { .. } => true,
            _ => false,
        }
    }

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        context: &EvaluationContext<'_>,
    ) -> Result<ExprValue> {
        match expr {
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOp::And => {
                    let left_val = context.evaluate(left, scope)?;
                    if !left_val.truthy() {
                        return Ok(ExprValue::Boolean(false));
                    }
                    let right_val = context.evaluate(right, scope)?;
                    Ok(ExprValue::Boolean(right_val.truthy()))
                }
                BinaryOp::Or => {
                    let left_val = context.evaluate(left, scope)?;
                    if left_val.truthy() {
                        return Ok(ExprValue::Boolean(true));
                    }
                    let right_val = context.evaluate(right, scope)?;
                    Ok(ExprValue::Boolean(right_val.truthy()))
                }
                _ => unreachable!("BooleanEvaluator: expected And/Or, got {:?}", op),
            },
            Expr::Not { expr } => {
                let val = context.evaluate(expr, scope)?;
                Ok(ExprValue::Boolean(!val.truthy()))
            }
            _ => unreachable!("BooleanEvaluator called with non-boolean expression"),
        }
    }
}
