use super::ast::{BinaryOp, Expr, Literal};
use super::lexer::{Token, tokenize};
use crate::core::{Result, SchemaError};
use crate::evaluator::DEFAULT_MAX_DEPTH;
use rust_decimal::Decimal;
use std::str::FromStr;

const PREFIX_PRECEDENCE: u8 = 7;

/// Precedence-climbing parser for the restricted expression grammar.
///
/// Only member access, indexing, calls, literals, unary `!`/`-` and binary
/// operators exist, so there is nothing to sandbox at run time: assignments,
/// statements and arbitrary lookups are unrepresentable.
///
/// Nesting (parentheses, unary operators, operands of tighter-binding
/// operators, call arguments) is limited to `max_depth` levels.
pub struct ExpressionParser {
    tokens: Vec<Token>,
    pos: usize,
    source: String,
    depth: usize,
    max_depth: usize,
}

impl ExpressionParser {
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source: source.to_string(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse(mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(SchemaError::ExpressionParse("empty expression".into()));
        }

        let expr = self.parse_expr(0)?;

        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected trailing token {:?}", token)));
        }

        Ok(expr)
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr> {
        // every recursive descent passes through here
        if self.depth >= self.max_depth {
            return Err(SchemaError::ExpressionParse(format!(
                "expression nesting exceeds {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = self.parse_binary(min_precedence);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_prefix()?;

        while let Some(op) = self.peek().and_then(binary_op) {
            let precedence = op.precedence();
            if precedence <= min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.parse_expr(precedence)?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Bang) => Ok(Expr::Not {
                expr: Box::new(self.parse_expr(PREFIX_PRECEDENCE)?),
            }),
            Some(Token::Minus) => Ok(Expr::Negate {
                expr: Box::new(self.parse_expr(PREFIX_PRECEDENCE)?),
            }),
            Some(Token::Plus) => self.parse_expr(PREFIX_PRECEDENCE),
            Some(_) => {
                self.pos -= 1;
                self.parse_postfix()
            }
            None => Err(self.error("unexpected end of expression".into())),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.advance() {
                        Some(Token::Ident(property)) => {
                            expr = Expr::Member {
                                object: Box::new(expr),
                                property,
                            };
                        }
                        other => {
                            return Err(
                                self.error(format!("expected property name, found {:?}", other))
                            );
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr(0)?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    let Expr::Identifier(name) = expr else {
                        return Err(self.error("only named functions can be called".into()));
                    };
                    self.pos += 1;
                    let args = self.parse_arguments()?;
                    expr = Expr::Function { name, args };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr(0)?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => {
                    return Err(self.error(format!("expected ',' or ')', found {:?}", other)));
                }
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(text)) => parse_number(&text).map(Expr::Literal),
            Some(Token::Str(text)) => Ok(Expr::Literal(Literal::String(text))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Boolean(true)),
                "false" => Expr::Literal(Literal::Boolean(false)),
                "null" | "undefined" => Expr::Literal(Literal::Null),
                _ => Expr::Identifier(name),
            }),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(self.error(format!("expected {:?}, found {:?}", expected, other))),
        }
    }

    fn error(&self, message: String) -> SchemaError {
        SchemaError::ExpressionParse(format!("{} in '{}'", message, self.source))
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Subtract,
        Token::Star => BinaryOp::Multiply,
        Token::Slash => BinaryOp::Divide,
        Token::Percent => BinaryOp::Modulo,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::NotEq,
        Token::Lt => BinaryOp::Lt,
        Token::LtEq => BinaryOp::LtEq,
        Token::Gt => BinaryOp::Gt,
        Token::GtEq => BinaryOp::GtEq,
        Token::AndAnd => BinaryOp::And,
        Token::OrOr => BinaryOp::Or,
        _ => return None,
    })
}

fn parse_number(text: &str) -> Result<Literal> {
    if text.contains('.') {
        return Decimal::from_str(text)
            .map(Literal::Decimal)
            .map_err(|e| SchemaError::ExpressionParse(format!("invalid number '{}': {}", text, e)));
    }

    match text.parse::<i64>() {
        Ok(i) => Ok(Literal::Integer(i)),
        Err(_) => Decimal::from_str(text).map(Literal::Decimal).map_err(|e| {
            SchemaError::ExpressionParse(format!("invalid number '{}': {}", text, e))
        }),
    }
}

/// Parses an expression string into an AST.
pub fn parse_expression(source: &str) -> Result<Expr> {
    ExpressionParser::new(source)?.parse()
}

pub fn parse_expression_with_depth(source: &str, max_depth: usize) -> Result<Expr> {
    ExpressionParser::new(source)?.with_max_depth(max_depth).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.into()))
    }

    #[test]
    fn member_access_and_comparison() {
        let expr = parse_expression("model.age < 18").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                left: Box::new(Expr::Member {
                    object: ident("model"),
                    property: "age".into(),
                }),
                op: BinaryOp::Lt,
                right: Box::new(Expr::Literal(Literal::Integer(18))),
            }
        );
    }

    #[test]
    fn precedence_binds_and_tighter_than_or() {
        let expr = parse_expression("a || b && c").unwrap();
        let Expr::BinaryOp { op, right, .. } = expr else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::And, .. }));
    }

    #[test]
    fn arithmetic_precedence() {
        let expr = parse_expression("1 + 2 * 3 - 4").unwrap();
        let Expr::BinaryOp { op, left, .. } = expr else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOp::Subtract);
        assert!(matches!(*left, Expr::BinaryOp { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn calls_index_and_unary() {
        let expr = parse_expression("!contains(model.tags, 'x') && -items[0] > 1.5").unwrap();
        assert!(matches!(expr, Expr::BinaryOp { op: BinaryOp::And, .. }));
        assert_eq!(
            parse_expression("years_since(birthDate)").unwrap().referenced_roots(),
            vec!["birthDate"]
        );
    }

    #[test]
    fn optional_chaining_parses_as_member_access() {
        assert_eq!(
            parse_expression("model?.address?.city == 'Oslo'").unwrap(),
            parse_expression("model.address.city == 'Oslo'").unwrap()
        );
    }

    #[test]
    fn malformed_expressions_fail() {
        for source in ["", "model.", "(a", "a b", "1 +", "f(1,", "a.b()"] {
            let err = parse_expression(source).unwrap_err();
            assert!(matches!(err, SchemaError::ExpressionParse(_)), "{}", source);
        }
    }

    #[test]
    fn nesting_beyond_the_limit_is_a_parse_error() {
        let deep = format!("{}true{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            parse_expression(&deep),
            Err(SchemaError::ExpressionParse(msg)) if msg.contains("nesting exceeds 64")
        ));
        assert!(parse_expression(&format!("{}!true", "!".repeat(100))).is_err());

        let shallow = format!("{}1 + 2{}", "(".repeat(10), ")".repeat(10));
        assert!(parse_expression(&shallow).is_ok());
        assert!(parse_expression_with_depth(&shallow, 5).is_err());
    }
}
