//! Binding and emission errors

use crate::binder::types::Type;
use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Type resolution failure; binding stops at the first one
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("Unbound identifier '{name}' at {location}")]
    UnboundIdentifier {
        name: String,
        location: SourceLocation,
    },

    #[error("Type '{ty}' has no member '{name}' at {location}")]
    MissingMember {
        ty: Type,
        name: String,
        location: SourceLocation,
    },

    #[error("No overload of '{name}' takes {arity} argument(s) at {location}")]
    OverloadNotFound {
        name: String,
        arity: usize,
        location: SourceLocation,
    },

    #[error("No overload of '{name}' accepts ({}) at {location}", join_types(.args))]
    ArgumentTypeMismatch {
        name: String,
        args: Vec<Type>,
        location: SourceLocation,
    },

    #[error("Operator '{op}' is not defined for '{left}' at {location}")]
    OperatorNotFound {
        op: String,
        left: Type,
        location: SourceLocation,
    },

    #[error("Operator '{op}' cannot be applied to ({}) at {location}", join_types(.operands))]
    InvalidOperation {
        op: String,
        operands: Vec<Type>,
        location: SourceLocation,
    },

    #[error("Conditional branches have incompatible types '{then_type}' and '{else_type}' at {location}")]
    BranchTypeMismatch {
        then_type: Type,
        else_type: Type,
        location: SourceLocation,
    },

    #[error("Declaration of '{name}' needs a type or an initializer at {location}")]
    InvalidDeclaration {
        name: String,
        location: SourceLocation,
    },

    #[error("Type error at {location}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        location: SourceLocation,
    },

    #[error("Unknown type '{name}' at {location}")]
    UnknownType {
        name: String,
        location: SourceLocation,
    },

    #[error("Expression at {location} cannot be assigned to")]
    NotAssignable { location: SourceLocation },

    #[error("Node at {location} is already resolved")]
    AlreadyResolved { location: SourceLocation },

    #[error("{what} is not supported by the binder at {location}")]
    Unsupported {
        what: String,
        location: SourceLocation,
    },
}

impl BindError {
    pub fn location(&self) -> SourceLocation {
        match self {
            BindError::UnboundIdentifier { location, .. }
            | BindError::MissingMember { location, .. }
            | BindError::OverloadNotFound { location, .. }
            | BindError::ArgumentTypeMismatch { location, .. }
            | BindError::OperatorNotFound { location, .. }
            | BindError::InvalidOperation { location, .. }
            | BindError::BranchTypeMismatch { location, .. }
            | BindError::InvalidDeclaration { location, .. }
            | BindError::TypeMismatch { location, .. }
            | BindError::UnknownType { location, .. }
            | BindError::NotAssignable { location }
            | BindError::AlreadyResolved { location }
            | BindError::Unsupported { location, .. } => *location,
        }
    }
}

/// Materialization failure while lowering a bound tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmitError {
    #[error("Node at {location} was not bound")]
    Unbound { location: SourceLocation },

    #[error("Type '{ty}' has no value to load at {location}")]
    NoValue { ty: Type, location: SourceLocation },

    #[error("Member at {location} is read-only")]
    ReadOnly { location: SourceLocation },

    #[error("{what} cannot be emitted at {location}")]
    Unsupported {
        what: String,
        location: SourceLocation,
    },
}

impl EmitError {
    pub fn location(&self) -> SourceLocation {
        match self {
            EmitError::Unbound { location }
            | EmitError::NoValue { location, .. }
            | EmitError::ReadOnly { location }
            | EmitError::Unsupported { location, .. } => *location,
        }
    }
}

fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
