//! Static type resolution and code emission
//!
//! The binder runs over a parsed tree before any code is generated:
//! - [`types`]: type handles, member descriptions and the [`types::TypeRegistry`]
//! - [`resolve`]: the [`Binder`] visitor that fills the node slots
//! - [`overload`]: implicit conversions and overload selection
//! - [`binding`]: where a bound name's value lives
//! - [`emit`]: lowering a bound tree into an [`emit::InstructionSink`]
//! - [`errors`]: [`BindError`] and [`EmitError`]
//!
//! Binding never evaluates anything. A node's slots are written exactly
//! once; rebinding the same tree fails with [`BindError::AlreadyResolved`].

pub mod binding;
pub mod emit;
pub mod errors;
pub mod overload;
pub mod resolve;
pub mod types;

pub use errors::{BindError, EmitError};
pub use resolve::Binder;
