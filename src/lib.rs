//! # Introduction
//!
//! scriptc parses a small C-like scripting language and gives the resulting
//! tree two consumers: a tree-walking evaluator, and a binder that resolves
//! every node to a static type and a target member so typed code can be
//! emitted for it. A terminal REPL built with
//! [ratatui](https://docs.rs/ratatui) drives both.
//!
//! ## Pipeline
//!
//! ```text
//!                    ┌─> Binder ──> Emitter ──> InstructionSink
//! Source → Scanner → Parser → tree
//!                    └─> Evaluator ──> Value
//! ```
//!
//! 1. [`parser`]: scans the source on demand and builds [`parser::ast`] nodes.
//! 2. [`binder`]: fills each node's type and binding slots, selecting
//!    overloads and inserting implicit conversions, then materializes the
//!    bound tree into instruction-sink calls.
//! 3. [`interpreter`]: evaluates the tree directly against an
//!    [`interpreter::Environment`] of frames, constants and function parts.
//! 4. [`ui`]: the REPL; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use scriptc::interpreter::{Environment, Value};
//!
//! let mut env = Environment::with_builtins();
//! let result = scriptc::run("var x = 2; x + 3 * 2", &mut env).unwrap();
//! assert_eq!(result, Value::Int(8));
//! assert_eq!(env.variable("x"), Some(&Value::Int(2)));
//! ```

pub mod binder;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod ui;

pub use error::Error;

use binder::emit::{Emitter, Instruction, RecordingSink};
use binder::types::{Type, TypeRegistry};
use binder::{BindError, Binder};
use interpreter::{Environment, EvalError, Evaluator, Value};
use parser::ast::{Expr, Statement};
use parser::{ParseError, Parser};

/// Parse a single expression (a trailing `;` is allowed).
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source).parse_expression()
}

/// Parse the first statement of `source`.
pub fn parse_statement(source: &str) -> Result<Statement, ParseError> {
    Parser::new(source).parse_statement()
}

pub fn parse_program(source: &str) -> Result<Vec<Statement>, ParseError> {
    Parser::new(source).parse_program()
}

/// Resolve types and bindings for `program` in place and return the type of
/// its trailing expression (`void` when there is none). `declaring_type`
/// makes that type's members visible by simple name.
pub fn bind(program: &[Statement], registry: &TypeRegistry, declaring_type: Option<Type>) -> Result<Type, BindError> {
    let mut binder = match declaring_type {
        Some(ty) => Binder::with_declaring_type(registry, ty),
        None => Binder::new(registry),
    };
    binder.bind_program(program)
}

/// Bind `program` and record the instructions emitted for it: the program
/// body first, then each script function body after its
/// [`Instruction::Function`] marker.
pub fn compile(
    program: &[Statement],
    registry: &TypeRegistry,
    declaring_type: Option<Type>,
) -> Result<Vec<Instruction>, Error> {
    Ok(compile_typed(program, registry, declaring_type)?.1)
}

/// [`compile`], also returning the program's type.
pub fn compile_typed(
    program: &[Statement],
    registry: &TypeRegistry,
    declaring_type: Option<Type>,
) -> Result<(Type, Vec<Instruction>), Error> {
    let mut binder = match declaring_type {
        Some(ty) => Binder::with_declaring_type(registry, ty),
        None => Binder::new(registry),
    };
    let ty = binder.bind_program(program)?;

    let mut sink = RecordingSink::new();
    let mut emitter = Emitter::new(registry, &mut sink);
    emitter.emit_program(program)?;
    emitter.emit_functions(program, binder.functions())?;
    Ok((ty, sink.instructions))
}

pub fn evaluate(program: &[Statement], env: &mut Environment) -> Result<Value, EvalError> {
    Evaluator::new(env).execute_program(program)
}

/// Parse and evaluate `source` against `env`.
pub fn run(source: &str, env: &mut Environment) -> Result<Value, Error> {
    let program = parse_program(source)?;
    Ok(evaluate(&program, env)?)
}
