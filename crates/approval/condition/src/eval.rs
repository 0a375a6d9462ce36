//! Evaluator: walks an [`Expr`] against a [`Context`]
//!
//! Comparison rules:
//! - both sides numeric (numbers or numeric strings): compared as numbers
//! - two strings: equality and lexical ordering
//! - otherwise equality holds only between equal values of the same type,
//!   and ordering is a [`ConditionError::TypeMismatch`]
//!
//! Missing fields resolve to `null`, so `entity.cost > 10` against an empty
//! entity is a type error, not `false`.

use crate::ast::{CompareOp, Expr};
use crate::errors::{ConditionError, ConditionResult};
use crate::value::{Context, Value};
use std::cmp::Ordering;

impl Expr {
    /// Evaluate this expression. Side-effect free.
    pub fn evaluate(&self, ctx: &Context) -> ConditionResult<Value> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Path(segments) => Ok(ctx.resolve(segments).clone()),
            Self::Neg(inner) => {
                let v = inner.evaluate(ctx)?;
                match v {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(ConditionError::NotANumber(other.type_name())),
                }
            }
            Self::Not(inner) => Ok(Value::Bool(!inner.evaluate(ctx)?.truthy())),
            Self::And(items) => {
                for item in items {
                    if !item.evaluate(ctx)?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Self::Or(items) => {
                for item in items {
                    if item.evaluate(ctx)?.truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Self::Compare { op, left, right } => {
                let l = left.evaluate(ctx)?;
                let r = right.evaluate(ctx)?;
                compare(*op, &l, &r).map(Value::Bool)
            }
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> ConditionResult<bool> {
    match op {
        CompareOp::Eq => Ok(equals(left, right)),
        CompareOp::Ne => Ok(!equals(left, right)),
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
            let ordering = order(left, right).ok_or_else(|| ConditionError::TypeMismatch {
                op: op.to_string(),
                left: left.type_name(),
                right: right.type_name(),
            })?;
            Ok(match op {
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}
