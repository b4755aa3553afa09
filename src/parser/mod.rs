pub mod ast;
mod expression;
mod lexer;

pub use expression::{ExpressionParser, parse_expression, parse_expression_with_depth};
