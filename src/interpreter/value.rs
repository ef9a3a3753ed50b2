//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the boxed value cell every literal,
//! variable and function result is carried in at run time. Values are tagged;
//! operators dispatch on the tag (see [`crate::interpreter::ops`]).
//!
//! # Value Types
//!
//! - [`Value::Null`]: the absent value (also what an unset `@variable` reads as)
//! - [`Value::Bool`], [`Value::Char`], [`Value::Str`]
//! - [`Value::Int`]: 64-bit signed integer
//! - [`Value::Float`] / [`Value::Double`]: 32/64-bit IEEE floats
//! - [`Value::Array`]: an ordered list of values

use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    Array(Vec<Value>),
}

/// The type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Double,
    Char,
    Str,
    Array,
}

impl ValueKind {
    /// Map a primitive type name as written in scripts to its tag.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ValueKind::Bool),
            "int" => Some(ValueKind::Int),
            "float" => Some(ValueKind::Float),
            "double" => Some(ValueKind::Double),
            "char" => Some(ValueKind::Char),
            "string" => Some(ValueKind::Str),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Char => "char",
            ValueKind::Str => "string",
            ValueKind::Array => "array",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Float | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Char(_) => ValueKind::Char,
            Value::Str(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the integer value, returns None if not an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic promotion. Chars count as their code point.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            Value::Char(c) => Some(*c as u32 as f64),
            _ => None,
        }
    }

    /// Integral view used by integer arithmetic and indexing.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Char(c) => Some(*c as i64),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Truthiness of a value in conditions and logical operators
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Double(x) => *x != 0.0,
            Value::Char(c) => *c != '\0',
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
        }
    }

    /// Convert to another primitive representation.
    ///
    /// Narrowing float-to-int conversions truncate toward zero. Returns `None`
    /// when the value has no representation in `kind` (e.g. an array as int).
    pub fn convert_to(&self, kind: ValueKind) -> Option<Value> {
        if self.kind() == kind {
            return Some(self.clone());
        }
        match kind {
            ValueKind::Null => None,
            ValueKind::Bool => Some(Value::Bool(self.is_truthy())),
            ValueKind::Int => match self {
                Value::Float(x) => Some(Value::Int(*x as i64)),
                Value::Double(x) => Some(Value::Int(*x as i64)),
                Value::Str(s) => s.trim().parse().ok().map(Value::Int),
                other => other.to_i64().map(Value::Int),
            },
            ValueKind::Float => match self {
                Value::Str(s) => s.trim().parse().ok().map(Value::Float),
                other => other.to_f64().map(|x| Value::Float(x as f32)),
            },
            ValueKind::Double => match self {
                Value::Str(s) => s.trim().parse().ok().map(Value::Double),
                other => other.to_f64().map(Value::Double),
            },
            ValueKind::Char => match self {
                Value::Int(n) => u32::try_from(*n).ok().and_then(char::from_u32).map(Value::Char),
                Value::Str(s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(Value::Char(c)),
                        _ => None,
                    }
                }
                _ => None,
            },
            ValueKind::Str => match self {
                Value::Null => None,
                other => Some(Value::Str(other.to_string())),
            },
            ValueKind::Array => None,
        }
    }

    /// Script-level equality: numbers compare across representations, other
    /// values compare only within their own kind.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => {
                match (a.as_int(), b.as_int()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a.to_f64() == b.to_f64(),
                }
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

// Floats compare by bit pattern so Eq and Hash agree (NaN == NaN here).
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Double(x) => x.to_bits().hash(state),
            Value::Char(c) => c.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Array(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
