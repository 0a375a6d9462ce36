//! Expression tree produced by the parser

use crate::value::Value;

/// Comparison operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        };
        f.write_str(symbol)
    }
}

/// A condition expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted field access from the context root, e.g. `entity.estimated_cost`
    Path(Vec<String>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    /// Short-circuit conjunction of two or more operands
    And(Vec<Expr>),
    /// Short-circuit disjunction of two or more operands
    Or(Vec<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Nesting depth of the tree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Path(_) => 1,
            Self::Neg(inner) | Self::Not(inner) => 1 + inner.depth(),
            Self::And(items) | Self::Or(items) => {
                1 + items.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Self::Compare { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Every dotted path the expression reads, in source order
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths(&self, out: &mut Vec<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Path(segments) => out.push(segments.join(".")),
            Self::Neg(inner) | Self::Not(inner) => inner.collect_paths(out),
            Self::And(items) | Self::Or(items) => {
                for item in items {
                    item.collect_paths(out);
                }
            }
            Self::Compare { left, right, .. } => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
        }
    }
}
