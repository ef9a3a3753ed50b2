//! Operator implementations on runtime values
//!
//! The value-level functions are pure; the `impl Evaluator` blocks in each
//! file evaluate operands and write results back where an operator mutates.

mod access;
mod assign;
mod binary;
mod unary;

pub use access::{call_method, element_value, member_value};
pub use binary::binary_values;
pub use unary::unary_value;
