//! Condition language for approval gates
//!
//! Gates are short, admin-authored boolean expressions evaluated against a
//! structured context:
//!
//! ```text
//! entity.estimated_cost > 10000 AND NOT (form.urgent == true)
//! initiator.department == 'R&D' || amount >= 50000
//! ```
//!
//! The pipeline is `Lexer` → `Parser` → [`Expr`] → [`Expr::evaluate`]. Every
//! stage is pure and bounded by [`Limits`]: expression length is checked
//! before lexing and nesting depth while parsing, so hostile input cannot
//! exhaust the stack.
//!
//! Errors are returned, never panicked. Deciding what a failed gate means
//! (the engine fails open) is the caller's business.
//!
//! # Example
//!
//! ```rust
//! use approval_condition::{Condition, Context, Limits, Value};
//!
//! let cond = Condition::parse("entity.cost > 10000", &Limits::default()).unwrap();
//! let ctx = Context::new().with("entity", Value::map([("cost", Value::from(5000))]));
//! assert!(!cond.test(&ctx).unwrap());
//! ```

#![deny(unsafe_code)]

mod ast;
mod errors;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::{CompareOp, Expr};
pub use errors::{ConditionError, ConditionResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use value::{Context, Value};

use serde::{Deserialize, Serialize};

/// Resource bounds applied to untrusted expression text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum expression length in characters
    pub max_expression_len: usize,
    /// Maximum nesting depth of the parsed expression
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_expression_len: 1024,
            max_depth: 32,
        }
    }
}

/// A parsed, reusable condition
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse `source` under the given limits
    pub fn parse(source: &str, limits: &Limits) -> ConditionResult<Self> {
        let expr = Parser::parse(source, limits)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate to a raw value
    pub fn evaluate(&self, context: &Context) -> ConditionResult<Value> {
        self.expr.evaluate(context)
    }

    /// Evaluate and coerce the result to a boolean
    pub fn test(&self, context: &Context) -> ConditionResult<bool> {
        Ok(self.evaluate(context)?.truthy())
    }
}

/// Parse and test `source` in one step
pub fn evaluate(source: &str, context: &Context, limits: &Limits) -> ConditionResult<bool> {
    Condition::parse(source, limits)?.test(context)
}
