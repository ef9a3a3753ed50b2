//! Tree-walking script evaluator
//!
//! This module provides the evaluation visitor:
//! - [`engine`]: the [`Evaluator`], call dispatch and the [`Flow`] marker
//! - [`environment`]: frame stack holding variables, constants and functions
//! - [`functions`]: function parts and the part selection rule
//! - [`builtins`]: native functions installed by [`Environment::with_builtins`]
//! - [`ops`]: operator implementations on runtime [`Value`]s
//! - [`errors`]: runtime error types
//!
//! # Execution Model
//!
//! Statements run in order against one mutable [`Environment`]. Blocks and
//! function calls push frames that are always popped again, errors included.
//! A `return` travels outward as [`Flow::Return`] until the enclosing call
//! (or the program) consumes it. No error is caught: the first failure ends
//! the evaluation.

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod environment;
pub mod errors;
mod expressions;
pub mod functions;
pub mod ops;
mod statements;
pub mod value;

pub use engine::{Evaluator, Flow};
pub use environment::Environment;
pub use errors::EvalError;
pub use value::Value;
