//! Condition error types

/// Errors raised while lexing, parsing or evaluating a condition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("Empty expression")]
    Empty,

    #[error("Expression is {len} characters long, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("Expression nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("Lex error at column {col}: {message}")]
    Lex { col: usize, message: String },

    #[error("Unexpected token at column {col}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        col: usize,
        expected: String,
        found: String,
    },

    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Cannot negate {0}")]
    NotANumber(&'static str),
}

/// Result type alias for condition operations
pub type ConditionResult<T> = Result<T, ConditionError>;
