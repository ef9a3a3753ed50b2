//! Runtime error types for the evaluator
//!
//! [`EvalError`] covers every failure of direct evaluation. All of them are
//! fatal: the statement being evaluated is abandoned and the error is
//! returned to the caller unchanged.

use crate::interpreter::value::{Value, ValueKind};
use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A function exists under the name but no part accepts the call
    #[error("No part of '{name}' accepts {arity} argument(s) at {location}")]
    MissingFunctionPart {
        name: String,
        arity: usize,
        location: SourceLocation,
    },

    #[error("Undefined function '{name}' at {location}")]
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },

    #[error("Unbound identifier '{name}' at {location}")]
    UnboundIdentifier {
        name: String,
        location: SourceLocation,
    },

    #[error("{what} is not implemented in evaluation mode at {location}")]
    NotImplemented {
        what: String,
        location: SourceLocation,
    },

    #[error("Operator '{op}' cannot be applied to ({}) at {location}", join_kinds(.operands))]
    InvalidOperands {
        op: String,
        operands: Vec<ValueKind>,
        location: SourceLocation,
    },

    #[error("Integer overflow in {operation} at {location}")]
    IntegerOverflow {
        operation: String,
        location: SourceLocation,
    },

    #[error("Division by zero at {location}")]
    DivisionByZero { location: SourceLocation },

    #[error("Index {index} out of range for length {len} at {location}")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        location: SourceLocation,
    },

    #[error("Expression at {location} cannot be assigned to")]
    InvalidAssignmentTarget { location: SourceLocation },

    #[error("Constant '_{name}' is already set at {location}")]
    ConstantReassignment {
        name: String,
        location: SourceLocation,
    },

    /// Raised by a `throw` statement
    #[error("Uncaught script error: {value} at {location}")]
    Thrown {
        value: Value,
        location: SourceLocation,
    },

    #[error("Call depth exceeded {limit} at {location}")]
    RecursionLimit {
        limit: usize,
        location: SourceLocation,
    },
}

impl EvalError {
    pub fn location(&self) -> SourceLocation {
        match self {
            EvalError::MissingFunctionPart { location, .. }
            | EvalError::UndefinedFunction { location, .. }
            | EvalError::UnboundIdentifier { location, .. }
            | EvalError::NotImplemented { location, .. }
            | EvalError::InvalidOperands { location, .. }
            | EvalError::IntegerOverflow { location, .. }
            | EvalError::DivisionByZero { location }
            | EvalError::IndexOutOfRange { location, .. }
            | EvalError::InvalidAssignmentTarget { location }
            | EvalError::ConstantReassignment { location, .. }
            | EvalError::Thrown { location, .. }
            | EvalError::RecursionLimit { location, .. } => *location,
        }
    }

    pub(crate) fn invalid_operands(op: &str, operands: &[&Value], location: SourceLocation) -> Self {
        EvalError::InvalidOperands {
            op: op.to_string(),
            operands: operands.iter().map(|v| v.kind()).collect(),
            location,
        }
    }

    pub(crate) fn not_implemented(what: &str, location: SourceLocation) -> Self {
        EvalError::NotImplemented {
            what: what.to_string(),
            location,
        }
    }
}

fn join_kinds(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}
