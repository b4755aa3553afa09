use super::super::{EvaluationContext, ExprValue, ExpressionEvaluator, Scope};
use crate::core::{Result, SchemaError};
use crate::parser::ast::{BinaryOp, Expr};
use chrono::Duration;
use rust_decimal::Decimal;

pub struct ArithmeticEvaluator;

impl ExpressionEvaluator for ArithmeticEvaluator {
    fn name(&self) -> &'static str {
        "ARITHMETIC"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        match expr {
            Expr::BinaryOp { op, .. } => op.is_arithmetic(),
            Expr::Negate { .. } => true,
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
            Expr::Negate { expr } => match context.evaluate(expr, scope)? {
                ExprValue::Integer(i) => i
                    .checked_neg()
                    .map(ExprValue::Integer)
                    .ok_or_else(overflow),
                ExprValue::Decimal(d) => Ok(ExprValue::Decimal(-d)),
                ExprValue::Null => Ok(ExprValue::Null),
                other => Err(SchemaError::ExpressionEvaluation(format!(
                    "Cannot negate {}",
                    other.type_name()
                ))),
            },
            Expr::BinaryOp { left, op, right } => {
                let left_val = context.evaluate(left, scope)?;
                let right_val = context.evaluate(right, scope)?;
                self.apply(left_val, *op, right_val)
            }
            _ => unreachable!(),
        }
    }
}

impl ArithmeticEvaluator {
    pub fn apply(&self, left: ExprValue, op: BinaryOp, right: ExprValue) -> Result<ExprValue> {
        match (left, right) {
            (ExprValue::Null, _) | (_, ExprValue::Null) => Ok(ExprValue::Null),

            (ExprValue::Integer(a), ExprValue::Integer(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Subtract => a.checked_sub(b),
                    BinaryOp::Multiply => a.checked_mul(b),
                    BinaryOp::Divide => {
                        if b == 0 {
                            return Err(division_by_zero());
                        }
                        if a % b != 0 {
                            return self.decimal(Decimal::from(a), op, Decimal::from(b));
                        }
                        a.checked_div(b)
                    }
                    BinaryOp::Modulo => {
                        if b == 0 {
                            return Err(SchemaError::ExpressionEvaluation("Modulo by zero".into()));
                        }
                        a.checked_rem(b)
                    }
                    _ => unreachable!(),
                };
                result.map(ExprValue::Integer).ok_or_else(overflow)
            }

            (ExprValue::String(a), b) if op == BinaryOp::Add => {
                Ok(ExprValue::String(format!("{}{}", a, b)))
            }
            (a, ExprValue::String(b)) if op == BinaryOp::Add => {
                Ok(ExprValue::String(format!("{}{}", a, b)))
            }

            (ExprValue::Date(d), ExprValue::Integer(days))
                if matches!(op, BinaryOp::Add | BinaryOp::Subtract) =>
            {
                let delta = Duration::try_days(days).ok_or_else(overflow)?;
                let shifted = if op == BinaryOp::Add {
                    d.checked_add_signed(delta)
                } else {
                    d.checked_sub_signed(delta)
                };
                shifted.map(ExprValue::Date).ok_or_else(overflow)
            }
            (ExprValue::Date(a), ExprValue::Date(b)) if op == BinaryOp::Subtract => {
                Ok(ExprValue::Integer((a - b).num_days()))
            }

            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => self.decimal(x, op, y),
                _ => Err(SchemaError::ExpressionEvaluation(format!(
                    "Operator '{}' requires numeric operands, got {} and {}",
                    op.symbol(),
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }

    fn decimal(&self, a: Decimal, op: BinaryOp, b: Decimal) -> Result<ExprValue> {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide => {
                if b.is_zero() {
                    return Err(division_by_zero());
                }
                a.checked_div(b)
            }
            BinaryOp::Modulo => {
                if b.is_zero() {
                    return Err(SchemaError::ExpressionEvaluation("Modulo by zero".into()));
                }
                a.checked_rem(b)
            }
            _ => unreachable!(),
        };
        result.map(ExprValue::Decimal).ok_or_else(overflow)
    }
}

fn overflow() -> SchemaError {
    SchemaError::ExpressionEvaluation("numeric overflow".into())
}

fn division_by_zero() -> SchemaError {
    SchemaError::ExpressionEvaluation("Division by zero".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn integer_division_stays_exact() {
        let eval = ArithmeticEvaluator;
        assert_eq!(
            eval.apply(ExprValue::Integer(6), BinaryOp::Divide, ExprValue::Integer(3)).unwrap(),
            ExprValue::Integer(2)
        );
        assert_eq!(
            eval.apply(ExprValue::Integer(7), BinaryOp::Divide, ExprValue::Integer(2)).unwrap(),
            ExprValue::Decimal(Decimal::from_str("3.5").unwrap())
        );
        assert!(eval.apply(ExprValue::Integer(1), BinaryOp::Divide, ExprValue::Integer(0)).is_err());
    }

    #[test]
    fn mixed_numeric_yields_decimal() {
        let eval = ArithmeticEvaluator;
        let price = ExprValue::Decimal(Decimal::from_str("19.99").unwrap());
        assert_eq!(
            eval.apply(price, BinaryOp::Multiply, ExprValue::Integer(3)).unwrap(),
            ExprValue::Decimal(Decimal::from_str("59.97").unwrap())
        );
    }

    #[test]
    fn string_concatenation_and_date_shift() {
        let eval = ArithmeticEvaluator;
        assert_eq!(
            eval.apply(ExprValue::String("Ada ".into()), BinaryOp::Add, ExprValue::Integer(1))
                .unwrap(),
            ExprValue::String("Ada 1".into())
        );
        let date = ExprValue::Date(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(
            eval.apply(date, BinaryOp::Add, ExprValue::Integer(1)).unwrap(),
            ExprValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn overflow_is_reported() {
        let eval = ArithmeticEvaluator;
        assert!(
            eval.apply(ExprValue::Integer(i64::MAX), BinaryOp::Add, ExprValue::Integer(1))
                .is_err()
        );
    }

    #[test]
    fn non_numeric_operands_name_the_operator() {
        let err = ArithmeticEvaluator
            .apply(ExprValue::Boolean(true), BinaryOp::Multiply, ExprValue::Integer(2))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::ExpressionEvaluation(
                "Operator '*' requires numeric operands, got boolean and integer".into()
            )
        );
    }
}
