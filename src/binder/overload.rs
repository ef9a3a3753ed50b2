//! Implicit conversion and overload search
//!
//! A call or operator binds to the most specific applicable candidate:
//!
//! 1. candidates whose parameter count differs from the argument count are
//!    discarded (`OverloadNotFound` when none remain);
//! 2. a candidate is applicable when every argument matches its parameter
//!    exactly or through one implicit conversion (`ArgumentTypeMismatch`
//!    when none is);
//! 3. between two applicable candidates, parameters are compared left to
//!    right and the first one where exactly one candidate matches exactly
//!    decides. Ties keep declaration order.
//!
//! The winner's per-argument conversions are recorded on the node so the
//! emitter can reapply them in argument order.

use crate::binder::errors::BindError;
use crate::binder::types::{MethodRef, Type, TypeRegistry};
use crate::parser::ast::SourceLocation;
use tracing::trace;

/// An implicit conversion applied to one argument or branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub method: MethodRef,
    pub from: Type,
    pub to: Type,
    /// Primitive widening lowered to a numeric conversion opcode
    pub intrinsic: bool,
}

/// One optional conversion per argument, in argument order
pub type ArgumentConversions = Vec<Option<Conversion>>;

/// What a call site invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Method(MethodRef),
    /// Index into the binder's script function table
    Script(usize),
    /// Invoke a delegate-typed value
    Delegate,
    /// Array element read
    ArrayElement,
    /// Parameterless construction of a type with no declared constructors
    DefaultConstructor(Type),
}

/// Resolved target of a call, `new` or indexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub callee: Callee,
    pub return_type: Type,
    pub conversions: ArgumentConversions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorKind {
    Method(MethodRef),
    /// `==` / `!=` on reference types without an overload
    ReferenceEquality,
    /// Short-circuit `&&` / `||` over bool operands
    Logical,
    /// Parenthesized sub-expression
    Transparent,
}

/// Resolved target of a unary or binary operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorTarget {
    pub kind: OperatorKind,
    pub conversions: ArgumentConversions,
}

impl OperatorTarget {
    pub fn transparent() -> Self {
        OperatorTarget {
            kind: OperatorKind::Transparent,
            conversions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
}

/// Conversion applied to one branch of a conditional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConversion {
    pub branch: Branch,
    pub conversion: Option<Conversion>,
}

/// How `arg` satisfies `param`: `Some(None)` exactly, `Some(Some(c))`
/// through conversion `c`, `None` not at all.
pub fn match_argument(registry: &TypeRegistry, arg: &Type, param: &Type) -> Option<Option<Conversion>> {
    if arg == param {
        return Some(None);
    }
    if *arg == Type::Null && param.is_reference() {
        return Some(None);
    }
    let method = registry.implicit_conversion(arg, param)?;
    let intrinsic = registry.method(&method).is_some_and(|m| m.intrinsic);
    Some(Some(Conversion {
        method,
        from: arg.clone(),
        to: param.clone(),
        intrinsic,
    }))
}

/// A candidate signature for overload selection
#[derive(Debug, Clone)]
pub struct Candidate<K> {
    pub key: K,
    pub params: Vec<Type>,
}

struct Applicable<K> {
    key: K,
    conversions: ArgumentConversions,
}

impl<K> Applicable<K> {
    fn is_better_than(&self, other: &Applicable<K>) -> bool {
        for (mine, theirs) in self.conversions.iter().zip(&other.conversions) {
            match (mine.is_none(), theirs.is_none()) {
                (true, false) => return true,
                (false, true) => return false,
                _ => {}
            }
        }
        false
    }
}

/// Pick the most specific applicable candidate for `args`.
pub fn select_overload<K>(
    registry: &TypeRegistry,
    name: &str,
    candidates: Vec<Candidate<K>>,
    args: &[Type],
    location: SourceLocation,
) -> Result<(K, ArgumentConversions), BindError> {
    let arity_matches: Vec<Candidate<K>> = candidates
        .into_iter()
        .filter(|c| c.params.len() == args.len())
        .collect();

    if arity_matches.is_empty() {
        return Err(BindError::OverloadNotFound {
            name: name.to_string(),
            arity: args.len(),
            location,
        });
    }

    let mut best: Option<Applicable<K>> = None;
    for candidate in arity_matches {
        let conversions: Option<ArgumentConversions> = args
            .iter()
            .zip(&candidate.params)
            .map(|(arg, param)| match_argument(registry, arg, param))
            .collect();
        let Some(conversions) = conversions else {
            continue;
        };
        let applicable = Applicable {
            key: candidate.key,
            conversions,
        };
        best = match best {
            Some(current) if !applicable.is_better_than(&current) => Some(current),
            _ => Some(applicable),
        };
    }

    match best {
        Some(winner) => {
            trace!(
                name,
                converted = winner.conversions.iter().filter(|c| c.is_some()).count(),
                "selected overload"
            );
            Ok((winner.key, winner.conversions))
        }
        None => Err(BindError::ArgumentTypeMismatch {
            name: name.to_string(),
            args: args.to_vec(),
            location,
        }),
    }
}

/// Candidates built from method handles of a registry.
pub fn method_candidates(registry: &TypeRegistry, methods: Vec<MethodRef>) -> Vec<Candidate<MethodRef>> {
    methods
        .into_iter()
        .filter_map(|method| {
            let params = registry.method(&method)?.params.clone();
            Some(Candidate { key: method, params })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::types::MethodDef;

    fn math() -> (TypeRegistry, Type) {
        let mut registry = TypeRegistry::new();
        let math = registry.declare("Math");
        registry
            .type_def_mut(&math)
            .unwrap()
            .add_method(MethodDef::new_static("Max", vec![Type::Double, Type::Double], Type::Double))
            .add_method(MethodDef::new_static("Max", vec![Type::Int, Type::Int], Type::Int))
            .add_method(MethodDef::new_static("Max", vec![Type::Int, Type::Double], Type::Double));
        (registry, math)
    }

    fn select(registry: &TypeRegistry, ty: &Type, args: &[Type]) -> Result<(MethodRef, ArgumentConversions), BindError> {
        let candidates = method_candidates(registry, registry.find_methods(ty, "Max"));
        select_overload(registry, "Max", candidates, args, SourceLocation::default())
    }

    #[test]
    fn test_exact_match_beats_conversion() {
        let (registry, math) = math();
        let (method, conversions) = select(&registry, &math, &[Type::Int, Type::Int]).unwrap();
        assert_eq!(method.index, 1);
        assert!(conversions.iter().all(Option::is_none));
    }

    #[test]
    fn test_leftmost_exact_parameter_decides() {
        let (registry, math) = math();
        let (method, conversions) = select(&registry, &math, &[Type::Int, Type::Double]).unwrap();
        assert_eq!(method.index, 2);
        assert!(conversions.iter().all(Option::is_none));

        let (method, conversions) = select(&registry, &math, &[Type::Double, Type::Int]).unwrap();
        assert_eq!(method.index, 0);
        assert!(conversions[0].is_none());
        assert_eq!(conversions[1].as_ref().map(|c| &c.to), Some(&Type::Double));
    }

    #[test]
    fn test_arity_and_type_failures_are_distinct() {
        let (registry, math) = math();
        assert!(matches!(
            select(&registry, &math, &[Type::Int]),
            Err(BindError::OverloadNotFound { arity: 1, .. })
        ));
        assert!(matches!(
            select(&registry, &math, &[Type::Str, Type::Int]),
            Err(BindError::ArgumentTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_null_matches_reference_parameters() {
        let registry = TypeRegistry::new();
        assert_eq!(match_argument(&registry, &Type::Null, &Type::Str), Some(None));
        assert_eq!(match_argument(&registry, &Type::Null, &Type::Int), None);
    }
}
