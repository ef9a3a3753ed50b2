//! Built-in function implementations
//!
//! Registered into the global frame by [`Environment::with_builtins`]. All
//! parts are native and callable from any scope.
//!
//! # Supported Built-ins
//!
//! - `print(...)`: joins its arguments with spaces and appends the line to
//!   the environment output
//! - `len(x)`: character count of a string, element count of an array
//! - `str(x)`: display form of any value
//! - `min(...)` / `max(...)`: smallest / largest of one or more numbers
//! - `abs(x)`: absolute value of a number

use crate::interpreter::engine::Evaluator;
use crate::interpreter::environment::Environment;
use crate::interpreter::errors::EvalError;
use crate::interpreter::functions::{Arity, FunctionPart};
use crate::interpreter::ops::binary_values;
use crate::interpreter::value::Value;
use crate::parser::ast::{BinOp, SourceLocation};
use std::cmp::Ordering;

pub fn register(env: &mut Environment) {
    env.define_function("print", FunctionPart::native(Arity::Variadic, builtin_print));
    env.define_function("len", FunctionPart::native(Arity::Fixed(1), builtin_len));
    env.define_function("str", FunctionPart::native(Arity::Fixed(1), builtin_str));
    env.define_function(
        "min",
        FunctionPart::native(Arity::Variadic, |_, args, location| {
            extremum("min", args, Ordering::Less, location)
        }),
    );
    env.define_function(
        "max",
        FunctionPart::native(Arity::Variadic, |_, args, location| {
            extremum("max", args, Ordering::Greater, location)
        }),
    );
    env.define_function("abs", FunctionPart::native(Arity::Fixed(1), builtin_abs));
}

fn builtin_print(evaluator: &mut Evaluator<'_>, args: &[Value], _location: SourceLocation) -> Result<Value, EvalError> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    evaluator.environment_mut().print(line);
    Ok(Value::Null)
}

fn builtin_len(_: &mut Evaluator<'_>, args: &[Value], location: SourceLocation) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(items) => Ok(Value::Int(items.len() as i64)),
        other => Err(EvalError::invalid_operands("len", &[other], location)),
    }
}

fn builtin_str(_: &mut Evaluator<'_>, args: &[Value], _location: SourceLocation) -> Result<Value, EvalError> {
    Ok(Value::Str(args[0].to_string()))
}

fn builtin_abs(_: &mut Evaluator<'_>, args: &[Value], location: SourceLocation) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or(EvalError::IntegerOverflow {
            operation: format!("abs({})", n),
            location,
        }),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        Value::Double(x) => Ok(Value::Double(x.abs())),
        other => Err(EvalError::invalid_operands("abs", &[other], location)),
    }
}

/// Fold `args` keeping the value that compares as `keep` against the rest.
/// Comparison goes through the `<` operator so mixed numeric kinds promote
/// the same way they do in expressions.
fn extremum(name: &str, args: &[Value], keep: Ordering, location: SourceLocation) -> Result<Value, EvalError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::MissingFunctionPart {
            name: name.to_string(),
            arity: 0,
            location,
        });
    };
    if !first.kind().is_numeric() {
        return Err(EvalError::invalid_operands(name, &[first], location));
    }

    let mut best = first.clone();
    for candidate in rest {
        if !candidate.kind().is_numeric() {
            return Err(EvalError::invalid_operands(name, &[candidate], location));
        }
        let (left, right) = match keep {
            Ordering::Less => (candidate, &best),
            _ => (&best, candidate),
        };
        if binary_values(BinOp::Lt, left, right, location)?.is_truthy() {
            best = candidate.clone();
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut env = Environment::with_builtins();
        let mut evaluator = Evaluator::new(&mut env);
        evaluator.call_function(name, args, SourceLocation::default())
    }

    #[test]
    fn test_print_appends_output() {
        let mut env = Environment::with_builtins();
        let mut evaluator = Evaluator::new(&mut env);
        evaluator
            .call_function(
                "print",
                vec![Value::Str("x =".into()), Value::Int(4)],
                SourceLocation::default(),
            )
            .unwrap();
        assert_eq!(env.output(), ["x = 4"]);
    }

    #[test]
    fn test_len_and_str() {
        assert_eq!(call("len", vec![Value::Str("héllo".into())]), Ok(Value::Int(5)));
        assert_eq!(
            call("len", vec![Value::Array(vec![Value::Null; 3])]),
            Ok(Value::Int(3))
        );
        assert!(matches!(
            call("len", vec![Value::Int(3)]),
            Err(EvalError::InvalidOperands { .. })
        ));
        assert_eq!(call("str", vec![Value::Double(1.5)]), Ok(Value::Str("1.5".into())));
    }

    #[test]
    fn test_min_max_keep_original_kind() {
        assert_eq!(
            call("max", vec![Value::Int(3), Value::Double(7.5), Value::Int(2)]),
            Ok(Value::Double(7.5))
        );
        assert_eq!(
            call("min", vec![Value::Int(3), Value::Double(7.5), Value::Int(2)]),
            Ok(Value::Int(2))
        );
        assert!(matches!(
            call("min", vec![]),
            Err(EvalError::MissingFunctionPart { arity: 0, .. })
        ));
    }

    #[test]
    fn test_abs() {
        assert_eq!(call("abs", vec![Value::Int(-4)]), Ok(Value::Int(4)));
        assert_eq!(call("abs", vec![Value::Double(-0.5)]), Ok(Value::Double(0.5)));
        assert!(matches!(
            call("abs", vec![Value::Int(i64::MIN)]),
            Err(EvalError::IntegerOverflow { .. })
        ));
    }
}
