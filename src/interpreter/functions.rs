//! Function overload table
//!
//! A [`Function`] is a name plus an append-only list of [`FunctionPart`]s.
//! Each part declares how many arguments it takes ([`Arity`]) and where it
//! may be called from ([`FunctionScope`]). For a call with `n` arguments
//! from scope `s`, [`Function::select`] picks, in order of preference:
//!
//! 1. a `Fixed(n)` part declared for exactly `s`
//! 2. a `Fixed(n)` part declared for `ANY`
//! 3. a `Variadic` part, exact scope before `ANY`
//!
//! Among parts of the same shape the most recently added wins, so a script
//! that redefines a function calls the new definition.

use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalError;
use crate::interpreter::value::Value;
use crate::parser::ast::{SourceLocation, Statement};
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

/// Applicability of a part, as a bitmask of call-site scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionScope(u8);

impl FunctionScope {
    pub const GLOBAL: FunctionScope = FunctionScope(0b001);
    pub const CLASS: FunctionScope = FunctionScope(0b010);
    pub const LOCAL: FunctionScope = FunctionScope(0b100);
    pub const ANY: FunctionScope = FunctionScope(0b111);

    pub fn contains(self, other: FunctionScope) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FunctionScope {
    type Output = FunctionScope;

    fn bitor(self, rhs: FunctionScope) -> FunctionScope {
        FunctionScope(self.0 | rhs.0)
    }
}

impl fmt::Display for FunctionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == FunctionScope::ANY {
            return write!(f, "any");
        }
        let names: Vec<&str> = [
            (FunctionScope::GLOBAL, "global"),
            (FunctionScope::CLASS, "class"),
            (FunctionScope::LOCAL, "local"),
        ]
        .into_iter()
        .filter(|(scope, _)| self.contains(*scope))
        .map(|(_, name)| name)
        .collect();
        write!(f, "{}", names.join("|"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "..."),
        }
    }
}

/// Host-provided implementation; receives the evaluator so it can call
/// back into the script or write output.
pub type NativeFn = Rc<dyn Fn(&mut Evaluator<'_>, &[Value], SourceLocation) -> Result<Value, EvalError>>;

#[derive(Clone)]
pub enum PartBody {
    Native(NativeFn),
    Script {
        params: Vec<String>,
        body: Rc<Vec<Statement>>,
    },
}

impl fmt::Debug for PartBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartBody::Native(_) => write!(f, "Native(..)"),
            PartBody::Script { params, body } => f
                .debug_struct("Script")
                .field("params", params)
                .field("statements", &body.len())
                .finish(),
        }
    }
}

/// One overload of a named function
#[derive(Debug, Clone)]
pub struct FunctionPart {
    pub arity: Arity,
    pub scope: FunctionScope,
    pub body: PartBody,
}

impl FunctionPart {
    pub fn native(
        arity: Arity,
        f: impl Fn(&mut Evaluator<'_>, &[Value], SourceLocation) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        FunctionPart {
            arity,
            scope: FunctionScope::ANY,
            body: PartBody::Native(Rc::new(f)),
        }
    }

    pub fn script(params: Vec<String>, body: Rc<Vec<Statement>>, scope: FunctionScope) -> Self {
        FunctionPart {
            arity: Arity::Fixed(params.len()),
            scope,
            body: PartBody::Script { params, body },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    parts: Vec<FunctionPart>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part; existing parts are kept.
    pub fn add(&mut self, part: FunctionPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[FunctionPart] {
        &self.parts
    }

    pub fn select(&self, arity: usize, scope: FunctionScope) -> Option<&FunctionPart> {
        let newest_first = || self.parts.iter().rev();

        newest_first()
            .find(|p| p.arity == Arity::Fixed(arity) && p.scope == scope)
            .or_else(|| newest_first().find(|p| p.arity == Arity::Fixed(arity) && p.scope == FunctionScope::ANY))
            .or_else(|| newest_first().find(|p| p.arity == Arity::Variadic && p.scope == scope))
            .or_else(|| newest_first().find(|p| p.arity == Arity::Variadic && p.scope == FunctionScope::ANY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(n: i64) -> impl Fn(&mut Evaluator<'_>, &[Value], SourceLocation) -> Result<Value, EvalError> {
        move |_, _, _| Ok(Value::Int(n))
    }

    fn tag(part: Option<&FunctionPart>) -> Option<(Arity, FunctionScope)> {
        part.map(|p| (p.arity, p.scope))
    }

    #[test]
    fn test_fixed_arity_beats_variadic() {
        let mut f = Function::new("f");
        f.add(FunctionPart::native(Arity::Fixed(1), constant(1)));
        f.add(FunctionPart::native(Arity::Variadic, constant(0)));
        f.add(FunctionPart::native(Arity::Fixed(2), constant(2)));

        assert_eq!(
            tag(f.select(2, FunctionScope::GLOBAL)),
            Some((Arity::Fixed(2), FunctionScope::ANY))
        );
        assert_eq!(
            tag(f.select(3, FunctionScope::GLOBAL)),
            Some((Arity::Variadic, FunctionScope::ANY))
        );
    }

    #[test]
    fn test_missing_part_without_variadic() {
        let mut f = Function::new("f");
        f.add(FunctionPart::native(Arity::Fixed(1), constant(1)));
        f.add(FunctionPart::native(Arity::Fixed(2), constant(2)));
        assert!(f.select(3, FunctionScope::GLOBAL).is_none());
        assert!(f.select(0, FunctionScope::LOCAL).is_none());
    }

    #[test]
    fn test_exact_scope_preferred_over_any() {
        let mut f = Function::new("f");
        let mut local = FunctionPart::native(Arity::Fixed(1), constant(1));
        local.scope = FunctionScope::LOCAL;
        f.add(local);
        f.add(FunctionPart::native(Arity::Fixed(1), constant(2)));

        assert_eq!(tag(f.select(1, FunctionScope::LOCAL)).map(|t| t.1), Some(FunctionScope::LOCAL));
        assert_eq!(tag(f.select(1, FunctionScope::GLOBAL)).map(|t| t.1), Some(FunctionScope::ANY));
    }

    #[test]
    fn test_parts_are_appended() {
        let mut f = Function::new("f");
        f.add(FunctionPart::native(Arity::Fixed(1), constant(1)));
        f.add(FunctionPart::native(Arity::Fixed(1), constant(2)));
        assert_eq!(f.parts().len(), 2);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(FunctionScope::ANY.to_string(), "any");
        assert_eq!((FunctionScope::GLOBAL | FunctionScope::LOCAL).to_string(), "global|local");
    }
}
