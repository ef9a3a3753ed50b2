//! Member access, indexing and method calls on values
//!
//! Strings and arrays expose the same members the binder's type registry
//! declares for them, with the same alias rules: `Length` (alias `len`) on
//! both, plus `ToUpper`/`upper`, `ToLower`/`lower`, `Substring` and
//! `Contains` on strings.

use crate::binder::types::MemberName;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalError;
use crate::interpreter::value::Value;
use crate::parser::ast::{Expr, SourceLocation};

fn length() -> MemberName {
    MemberName::new("Length").with_alias("len")
}

/// Read member `name` of `value`.
pub fn member_value(value: &Value, name: &str, location: SourceLocation) -> Result<Value, EvalError> {
    match value {
        Value::Str(s) if length().matches(name) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(items) if length().matches(name) => Ok(Value::Int(items.len() as i64)),
        other => Err(EvalError::UnboundIdentifier {
            name: format!("{}.{}", other.kind(), name),
            location,
        }),
    }
}

/// Position of element `index` in a sequence of `len` elements.
pub(crate) fn element_slot(len: usize, index: i64, location: SourceLocation) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(EvalError::IndexOutOfRange { index, len, location })
}

/// Element `index` of an array or string.
pub fn element_value(value: &Value, index: i64, location: SourceLocation) -> Result<Value, EvalError> {
    match value {
        Value::Array(items) => {
            let slot = element_slot(items.len(), index, location)?;
            Ok(items[slot].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let slot = element_slot(len, index, location)?;
            s.chars()
                .nth(slot)
                .map(Value::Char)
                .ok_or(EvalError::IndexOutOfRange { index, len, location })
        }
        other => Err(EvalError::invalid_operands("[]", &[other], location)),
    }
}

fn int_arg(name: &str, value: &Value, location: SourceLocation) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Char(c) => Ok(*c as i64),
        other => Err(EvalError::invalid_operands(name, &[other], location)),
    }
}

/// Call method `name` on `value`.
pub fn call_method(value: &Value, name: &str, args: &[Value], location: SourceLocation) -> Result<Value, EvalError> {
    let Value::Str(s) = value else {
        return Err(EvalError::UndefinedFunction {
            name: format!("{}.{}", value.kind(), name),
            location,
        });
    };

    let upper = MemberName::new("ToUpper").with_alias("upper");
    let lower = MemberName::new("ToLower").with_alias("lower");

    match args {
        [] if upper.matches(name) => Ok(Value::Str(s.to_uppercase())),
        [] if lower.matches(name) => Ok(Value::Str(s.to_lowercase())),
        [start, count] if name == "Substring" => {
            let start = int_arg(name, start, location)?;
            let count = int_arg(name, count, location)?;
            let len = s.chars().count();
            let first = element_slot(len + 1, start, location)?;
            let taken = usize::try_from(count)
                .ok()
                .filter(|n| first + n <= len)
                .ok_or(EvalError::IndexOutOfRange {
                    index: start + count,
                    len,
                    location,
                })?;
            Ok(Value::Str(s.chars().skip(first).take(taken).collect()))
        }
        [Value::Str(needle)] if name == "Contains" => Ok(Value::Bool(s.contains(needle.as_str()))),
        _ if upper.matches(name) || lower.matches(name) || name == "Substring" || name == "Contains" => {
            Err(EvalError::MissingFunctionPart {
                name: name.to_string(),
                arity: args.len(),
                location,
            })
        }
        _ => Err(EvalError::UndefinedFunction {
            name: format!("string.{}", name),
            location,
        }),
    }
}

impl Evaluator<'_> {
    pub(crate) fn evaluate_member_access(
        &mut self,
        target: &Expr,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let value = self.evaluate_expression(target)?;
        member_value(&value, name, location)
    }

    /// The single integer argument of an index expression.
    pub(crate) fn evaluate_index_arg(&mut self, args: &[Expr], location: SourceLocation) -> Result<i64, EvalError> {
        let [arg] = args else {
            return Err(EvalError::MissingFunctionPart {
                name: "[]".to_string(),
                arity: args.len(),
                location,
            });
        };
        let index = self.evaluate_expression(arg)?;
        int_arg("[]", &index, location)
    }

    pub(crate) fn evaluate_index(
        &mut self,
        target: &Expr,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let container = self.evaluate_expression(target)?;
        let index = self.evaluate_index_arg(args, location)?;
        element_value(&container, index, location)
    }

    pub(crate) fn evaluate_method_call(
        &mut self,
        target: &Expr,
        name: &str,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let value = self.evaluate_expression(target)?;
        let args = self.evaluate_arguments(args)?;
        call_method(&value, name, &args, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    #[test]
    fn test_length_aliases() {
        let loc = SourceLocation::default();
        assert_eq!(member_value(&text("abc"), "Length", loc), Ok(Value::Int(3)));
        assert_eq!(member_value(&text("abc"), "LEN", loc), Ok(Value::Int(3)));
        assert!(member_value(&text("abc"), "length", loc).is_err());
        assert_eq!(
            member_value(&Value::Array(vec![Value::Int(1)]), "len", loc),
            Ok(Value::Int(1))
        );
    }

    #[test]
    fn test_indexing() {
        let loc = SourceLocation::default();
        let items = Value::Array(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(element_value(&items, 1, loc), Ok(Value::Int(20)));
        assert!(matches!(
            element_value(&items, 2, loc),
            Err(EvalError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
        assert!(matches!(
            element_value(&items, -1, loc),
            Err(EvalError::IndexOutOfRange { .. })
        ));
        assert_eq!(element_value(&text("héllo"), 1, loc), Ok(Value::Char('é')));
    }

    #[test]
    fn test_string_methods() {
        let loc = SourceLocation::default();
        assert_eq!(call_method(&text("MiXed"), "upper", &[], loc), Ok(text("MIXED")));
        assert_eq!(call_method(&text("MiXed"), "ToLower", &[], loc), Ok(text("mixed")));
        assert_eq!(
            call_method(&text("script"), "Substring", &[Value::Int(1), Value::Int(3)], loc),
            Ok(text("cri"))
        );
        assert!(matches!(
            call_method(&text("script"), "Substring", &[Value::Int(4), Value::Int(3)], loc),
            Err(EvalError::IndexOutOfRange { .. })
        ));
        assert_eq!(
            call_method(&text("script"), "Contains", &[text("rip")], loc),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            call_method(&text("s"), "upper", &[Value::Int(1)], loc),
            Err(EvalError::MissingFunctionPart { arity: 1, .. })
        ));
        assert!(matches!(
            call_method(&Value::Int(1), "upper", &[], loc),
            Err(EvalError::UndefinedFunction { .. })
        ));
    }
}
