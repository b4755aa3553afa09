use super::super::{EvaluationContext, ExprValue, ExpressionEvaluator, Scope};
use crate::core::{Result, SchemaError};
use crate::parser::ast::Expr;
use chrono::{Datelike, NaiveDate};

/// Fixed table of side-effect free functions.
pub struct FunctionEvaluator;

impl ExpressionEvaluator for FunctionEvaluator {
    fn name(&self) -> &'static str {
        "FUNCTION"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Function { .. })
    }

    fn evaluate(
        &self,
        expr: &Expr,
        scope: &Scope,
        context: &EvaluationContext<'_>,
    ) -> Result<ExprValue> {
        let Expr::Function { name, args } = expr else {
            unreachable!()
        };

        let mut eval_args = Vec::with_capacity(args.len());
        for arg in args {
            eval_args.push(context.evaluate(arg, scope)?);
        }

        match name.to_ascii_lowercase().as_str() {
            "len" | "length" => self.length(&eval_args),
            "lower" => self.map_text(&eval_args, "lower", str::to_lowercase),
            "upper" => self.map_text(&eval_args, "upper", str::to_uppercase),
            "concat" => Ok(self.concat(&eval_args)),
            "coalesce" => Ok(self.coalesce(&eval_args)),
            "contains" => self.contains(&eval_args),
            "today" => {
                expect_args("today", &eval_args, 0)?;
                Ok(ExprValue::Date(context.today()))
            }
            "years_since" => self.years_since(&eval_args, context.today()),
            "days_between" => self.days_between(&eval_args),
            _ => Err(SchemaError::ExpressionEvaluation(format!(
                "Unknown function: {}",
                name
            ))),
        }
    }
}

impl FunctionEvaluator {
    fn length(&self, args: &[ExprValue]) -> Result<ExprValue> {
        expect_args("len", args, 1)?;
        match &args[0] {
            ExprValue::String(s) => Ok(ExprValue::Integer(s.chars().count() as i64)),
            ExprValue::List(items) => Ok(ExprValue::Integer(items.len() as i64)),
            ExprValue::Null => Ok(ExprValue::Integer(0)),
            other => Err(SchemaError::ExpressionEvaluation(format!(
                "len expects a string or list, got {}",
                other.type_name()
            ))),
        }
    }

    fn map_text(&self, args: &[ExprValue], name: &str, f: fn(&str) -> String) -> Result<ExprValue> {
        expect_args(name, args, 1)?;
        match &args[0] {
            ExprValue::Null => Ok(ExprValue::Null),
            ExprValue::String(s) => Ok(ExprValue::String(f(s))),
            other => Ok(ExprValue::String(f(&other.to_string()))),
        }
    }

    fn concat(&self, args: &[ExprValue]) -> ExprValue {
        ExprValue::String(
            args.iter()
                .filter(|arg| !arg.is_null())
                .map(|arg| arg.to_string())
                .collect(),
        )
    }

    fn coalesce(&self, args: &[ExprValue]) -> ExprValue {
        args.iter()
            .find(|arg| !arg.is_null())
            .cloned()
            .unwrap_or(ExprValue::Null)
    }

    fn contains(&self, args: &[ExprValue]) -> Result<ExprValue> {
        expect_args("contains", args, 2)?;
        match (&args[0], &args[1]) {
            (ExprValue::Null, _) => Ok(ExprValue::Boolean(false)),
            (ExprValue::List(items), needle) => Ok(ExprValue::Boolean(items.contains(needle))),
            (ExprValue::String(haystack), ExprValue::String(needle)) => {
                Ok(ExprValue::Boolean(haystack.contains(needle.as_str())))
            }
            (haystack, _) => Err(SchemaError::ExpressionEvaluation(format!(
                "contains expects a list or string, got {}",
                haystack.type_name()
            ))),
        }
    }

    /// Whole years elapsed between a date and the evaluation date.
    fn years_since(&self, args: &[ExprValue], today: NaiveDate) -> Result<ExprValue> {
        expect_args("years_since", args, 1)?;
        if args[0].is_null() {
            return Ok(ExprValue::Null);
        }
        let date = date_arg("years_since", &args[0])?;
        let mut years = today.year() - date.year();
        if (today.month(), today.day()) < (date.month(), date.day()) {
            years -= 1;
        }
        Ok(ExprValue::Integer(i64::from(years)))
    }

    fn days_between(&self, args: &[ExprValue]) -> Result<ExprValue> {
        expect_args("days_between", args, 2)?;
        if args.iter().any(ExprValue::is_null) {
            return Ok(ExprValue::Null);
        }
        let from = date_arg("days_between", &args[0])?;
        let to = date_arg("days_between", &args[1])?;
        Ok(ExprValue::Integer((to - from).num_days()))
    }
}

fn expect_args(name: &str, args: &[ExprValue], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(SchemaError::ExpressionEvaluation(format!(
            "{} expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn date_arg(name: &str, value: &ExprValue) -> Result<NaiveDate> {
    value.as_date().ok_or_else(|| {
        SchemaError::ExpressionEvaluation(format!(
            "{} expects a date, got {}",
            name,
            value.type_name()
        ))
    })
}
