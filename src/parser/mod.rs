//! Script parser
//!
//! This module turns script text into a syntax tree:
//! - [`lexer`]: on-demand tokenization (source text → tokens)
//! - [`keywords`]: the reserved word table
//! - [`parse`]: the [`Parser`] and its entry points
//! - [`ast`]: expression and statement nodes
//!
//! # Language Overview
//!
//! - Literals: decimal/hex/octal numbers, backtick strings, `true`, `false`, `null`
//! - Names: plain identifiers, `@variable` and `_Constant` sigil forms
//! - Expressions: C-style operators, `?:`, calls, indexers, member access,
//!   `??` fallback, `->` initializer arrow, `new`, `lambda`
//! - Statements: `var`, `function`, `if`/`else`, `return`, `throw`, blocks
//!
//! Hand-written recursive descent with one method per precedence level.

pub mod ast;
mod expressions;
pub mod keywords;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};
