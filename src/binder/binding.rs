//! Resolved storage of names and member accesses
//!
//! A [`Binding`] says where the value of a bound node lives. Loading and
//! storing are match arms on the variant; instance members expect their
//! owner to be on the stack already.

use crate::binder::emit::{InstructionSink, Invocation};
use crate::binder::errors::EmitError;
use crate::binder::types::{FieldRef, PropertyRef, Type};
use crate::parser::ast::SourceLocation;
use std::fmt;

/// A local variable slot of the enclosing function or program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSlot {
    pub index: usize,
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Variable(LocalSlot),
    Parameter {
        index: usize,
        ty: Type,
    },
    Field {
        field: FieldRef,
        ty: Type,
        is_static: bool,
    },
    Property {
        property: PropertyRef,
        ty: Type,
        is_static: bool,
        writable: bool,
    },
    /// A bare type name with no value
    EmptyType(Type),
}

impl Binding {
    pub fn ty(&self) -> &Type {
        match self {
            Binding::Variable(slot) => &slot.ty,
            Binding::Parameter { ty, .. }
            | Binding::Field { ty, .. }
            | Binding::Property { ty, .. } => ty,
            Binding::EmptyType(ty) => ty,
        }
    }

    pub fn is_settable(&self) -> bool {
        match self {
            Binding::Variable(_) | Binding::Parameter { .. } | Binding::Field { .. } => true,
            Binding::Property { writable, .. } => *writable,
            Binding::EmptyType(_) => false,
        }
    }

    /// Instance members need their owner loaded before get/set.
    pub fn needs_instance(&self) -> bool {
        matches!(
            self,
            Binding::Field {
                is_static: false,
                ..
            } | Binding::Property {
                is_static: false,
                ..
            }
        )
    }

    pub fn generate_get(&self, sink: &mut dyn InstructionSink, location: SourceLocation) -> Result<(), EmitError> {
        match self {
            Binding::Variable(slot) => sink.load_local(slot.index),
            Binding::Parameter { index, .. } => sink.load_argument(*index),
            Binding::Field { field, is_static, .. } => sink.load_field(field, *is_static),
            Binding::Property { property, .. } => {
                sink.call(&Invocation::PropertyGet(property.clone()))
            }
            Binding::EmptyType(ty) => {
                return Err(EmitError::NoValue {
                    ty: ty.clone(),
                    location,
                })
            }
        }
        Ok(())
    }

    /// Store the value on top of the stack.
    pub fn generate_set(&self, sink: &mut dyn InstructionSink, location: SourceLocation) -> Result<(), EmitError> {
        match self {
            Binding::Variable(slot) => sink.store_local(slot.index),
            Binding::Parameter { index, .. } => sink.store_argument(*index),
            Binding::Field { field, is_static, .. } => sink.store_field(field, *is_static),
            Binding::Property {
                property, writable, ..
            } => {
                if !writable {
                    return Err(EmitError::ReadOnly { location });
                }
                sink.call(&Invocation::PropertySet(property.clone()))
            }
            Binding::EmptyType(ty) => {
                return Err(EmitError::NoValue {
                    ty: ty.clone(),
                    location,
                })
            }
        }
        Ok(())
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Variable(slot) => write!(f, "local #{} {}: {}", slot.index, slot.name, slot.ty),
            Binding::Parameter { index, ty } => write!(f, "arg #{}: {}", index, ty),
            Binding::Field { field, ty, is_static } => {
                let kind = if *is_static { "static field" } else { "field" };
                write!(f, "{} {}#{}: {}", kind, field.owner, field.index, ty)
            }
            Binding::Property { property, ty, .. } => {
                write!(f, "property {}#{}: {}", property.owner, property.index, ty)
            }
            Binding::EmptyType(ty) => write!(f, "type {}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::emit::{Instruction, RecordingSink};

    fn at() -> SourceLocation {
        SourceLocation::default()
    }

    #[test]
    fn test_variable_and_parameter_access() {
        let local = Binding::Variable(LocalSlot {
            index: 2,
            name: "x".to_string(),
            ty: Type::Int,
        });
        let arg = Binding::Parameter {
            index: 0,
            ty: Type::Double,
        };

        let mut sink = RecordingSink::new();
        local.generate_get(&mut sink, at()).unwrap();
        arg.generate_set(&mut sink, at()).unwrap();
        assert_eq!(
            sink.instructions,
            vec![Instruction::LoadLocal(2), Instruction::StoreArgument(0)]
        );
        assert_eq!(local.ty(), &Type::Int);
        assert!(!local.needs_instance());
        assert_eq!(local.to_string(), "local #2 x: int");
    }

    #[test]
    fn test_read_only_and_type_bindings_reject_stores() {
        let property = Binding::Property {
            property: PropertyRef {
                owner: Type::Str,
                index: 0,
            },
            ty: Type::Int,
            is_static: false,
            writable: false,
        };
        assert!(property.needs_instance());
        assert!(!property.is_settable());

        let mut sink = RecordingSink::new();
        property.generate_get(&mut sink, at()).unwrap();
        assert!(matches!(
            property.generate_set(&mut sink, at()),
            Err(EmitError::ReadOnly { .. })
        ));

        let bare = Binding::EmptyType(Type::Str);
        assert!(matches!(
            bare.generate_get(&mut sink, at()),
            Err(EmitError::NoValue { ty: Type::Str, .. })
        ));
        assert_eq!(sink.instructions.len(), 1);
    }
}
