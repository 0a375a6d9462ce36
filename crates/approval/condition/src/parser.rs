//! Parser: recursive descent over condition tokens
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr       := or
//! or         := and ( OR and )*
//! and        := not ( AND not )*
//! not        := NOT not | comparison
//! comparison := unary ( ( == | != | > | >= | < | <= ) unary )?
//! unary      := - unary | primary
//! primary    := number | string | true | false | null | path | ( expr )
//! path       := identifier ( . ( identifier | number ) )*
//! ```
//!
//! Comparisons do not chain: `a < b < c` is a parse error.

use crate::ast::{CompareOp, Expr};
use crate::errors::{ConditionError, ConditionResult};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;
use crate::Limits;

/// Parser for condition expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Parse `input` into an expression tree, enforcing `limits`
    pub fn parse(input: &str, limits: &Limits) -> ConditionResult<Expr> {
        let len = input.chars().count();
        if len > limits.max_expression_len {
            return Err(ConditionError::TooLong {
                len,
                max: limits.max_expression_len,
            });
        }
        if input.trim().is_empty() {
            return Err(ConditionError::Empty);
        }

        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: limits.max_depth,
        };

        let expr = parser.parse_or()?;
        parser.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> ConditionResult<Expr> {
        self.enter()?;
        let mut items = vec![self.parse_and()?];
        while self.check(TokenKind::Or) {
            self.advance();
            items.push(self.parse_and()?);
        }
        self.leave();
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn parse_and(&mut self) -> ConditionResult<Expr> {
        let mut items = vec![self.parse_not()?];
        while self.check(TokenKind::And) {
            self.advance();
            items.push(self.parse_not()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn parse_not(&mut self) -> ConditionResult<Expr> {
        if self.check(TokenKind::Not) {
            self.advance();
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ConditionResult<Expr> {
        let left = self.parse_unary()?;

        let op = match self.peek().kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_unary()?;

        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_unary(&mut self) -> ConditionResult<Expr> {
        if self.check(TokenKind::Minus) {
            self.advance();
            self.enter()?;
            let inner = self.parse_unary()?;
            self.leave();
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ConditionResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::NumberLiteral => {
                self.advance();
                let n = token.text.parse::<f64>().map_err(|_| ConditionError::Lex {
                    col: token.col,
                    message: format!("invalid number '{}'", token.text),
                })?;
                Ok(Expr::Literal(Value::Number(n)))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Literal(Value::String(token.text)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::Identifier => self.parse_path(),
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a value, field or '('")),
        }
    }

    fn parse_path(&mut self) -> ConditionResult<Expr> {
        let mut segments = vec![self.expect(TokenKind::Identifier)?.text.clone()];
        while self.check(TokenKind::Dot) {
            self.advance();
            let token = self.peek().clone();
            match token.kind {
                // Keywords are valid field names after a dot: `form.not`, `entity.null`
                TokenKind::Identifier
                | TokenKind::NumberLiteral
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null => {
                    self.advance();
                    segments.push(token.text);
                }
                _ => return Err(self.unexpected("a field name after '.'")),
            }
        }
        Ok(Expr::Path(segments))
    }

    // ── Token helpers ────────────────────────────────────────────────

    fn enter(&mut self) -> ConditionResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ConditionError::TooDeep {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, and advance() never passes it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ConditionResult<&Token> {
        if self.check(kind) {
            let idx = self.pos;
            self.advance();
            Ok(&self.tokens[idx])
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ConditionError {
        let token = self.peek();
        ConditionError::UnexpectedToken {
            col: token.col,
            expected: expected.to_string(),
            found: if token.kind == TokenKind::Eof {
                token.kind.to_string()
            } else {
                token.text.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ConditionResult<Expr> {
        Parser::parse(input, &Limits::default())
    }

    fn path(p: &str) -> Box<Expr> {
        Box::new(Expr::Path(p.split('.').map(String::from).collect()))
    }

    #[test]
    fn test_simple_comparison() {
        let expr = parse("entity.estimated_cost > 10000").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Gt,
                left: path("entity.estimated_cost"),
                right: Box::new(Expr::Literal(Value::Number(10000.0))),
            }
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = parse("a OR b AND c").unwrap();
        match expr {
            Expr::Or(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1], Expr::And(_)));
            }
            other => panic!("expected OR at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_chains_are_flattened() {
        let expr = parse("a && b && c && d").unwrap();
        assert!(matches!(expr, Expr::And(ref items) if items.len() == 4));
        assert_eq!(expr.depth(), 2);
    }

    #[test]
    fn test_not_and_parentheses() {
        let expr = parse("NOT (a == 1 OR b == 2)").unwrap();
        assert!(matches!(expr, Expr::Not(ref inner) if matches!(**inner, Expr::Or(_))));
        assert_eq!(expr.paths(), vec!["a", "b"]);
    }

    #[test]
    fn test_negative_numbers() {
        let expr = parse("delta >= -5.5").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare { ref right, .. } if matches!(**right, Expr::Neg(_))
        ));
    }

    #[test]
    fn test_keyword_field_names_after_dot() {
        let expr = parse("form.not == true").unwrap();
        assert_eq!(expr.paths(), vec!["form.not"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(ConditionError::Empty)));
        assert!(matches!(parse("a >"), Err(ConditionError::UnexpectedToken { .. })));
        assert!(matches!(parse("(a > 1"), Err(ConditionError::UnexpectedToken { .. })));
        assert!(matches!(parse("a > 1 )"), Err(ConditionError::UnexpectedToken { .. })));
        assert!(matches!(parse("1 < a < 3"), Err(ConditionError::UnexpectedToken { .. })));
        assert!(matches!(parse("entity."), Err(ConditionError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_length_limit() {
        let limits = Limits {
            max_expression_len: 10,
            max_depth: 32,
        };
        let result = Parser::parse("amount > 1000000", &limits);
        assert!(matches!(result, Err(ConditionError::TooLong { len: 16, max: 10 })));
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_expression_len: 10_000,
            max_depth: 8,
        };
        let deep = format!("{}a{}", "(".repeat(20), ")".repeat(20));
        assert!(matches!(
            Parser::parse(&deep, &limits),
            Err(ConditionError::TooDeep { max: 8 })
        ));

        let nots = format!("{}a", "NOT ".repeat(20));
        assert!(matches!(
            Parser::parse(&nots, &limits),
            Err(ConditionError::TooDeep { .. })
        ));

        assert!(Parser::parse("((a))", &limits).is_ok());
    }
}
