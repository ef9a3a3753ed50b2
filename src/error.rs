//! Crate-level error aggregating every pipeline stage

use crate::binder::{BindError, EmitError};
use crate::interpreter::EvalError;
use crate::parser::ParseError;
use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn location(&self) -> SourceLocation {
        match self {
            Error::Parse(err) => err.location(),
            Error::Bind(err) => err.location(),
            Error::Emit(err) => err.location(),
            Error::Eval(err) => err.location(),
        }
    }

    /// Short stage name used as a message prefix by the host.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse error",
            Error::Bind(_) => "bind error",
            Error::Emit(_) => "emit error",
            Error::Eval(_) => "runtime error",
        }
    }
}
