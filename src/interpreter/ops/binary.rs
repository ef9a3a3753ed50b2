//! Binary operator evaluation
//!
//! Operands are dispatched on their runtime tags. Numbers promote along
//! `int < float < double` (chars count as ints); `+` with a string on either
//! side concatenates. Integer arithmetic is checked.

use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalError;
use crate::interpreter::value::Value;
use crate::parser::ast::{BinOp, Expr, SourceLocation};
use std::cmp::Ordering;

/// Both operands converted to their common numeric representation
enum Promoted {
    Int(i64, i64),
    Float(f32, f32),
    Double(f64, f64),
}

fn is_integral(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Char(_))
}

fn promote(left: &Value, right: &Value) -> Option<Promoted> {
    let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Char(_) | Value::Float(_) | Value::Double(_));
    if !numeric(left) || !numeric(right) {
        return None;
    }

    if matches!(left, Value::Double(_)) || matches!(right, Value::Double(_)) {
        Some(Promoted::Double(left.to_f64()?, right.to_f64()?))
    } else if matches!(left, Value::Float(_)) || matches!(right, Value::Float(_)) {
        Some(Promoted::Float(left.to_f64()? as f32, right.to_f64()? as f32))
    } else {
        Some(Promoted::Int(left.to_i64()?, right.to_i64()?))
    }
}

fn checked_int(op: BinOp, a: i64, b: i64, location: SourceLocation) -> Result<Value, EvalError> {
    if matches!(op, BinOp::Div | BinOp::Mod) && b == 0 {
        return Err(EvalError::DivisionByZero { location });
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => a.checked_div(b),
        BinOp::Mod => a.checked_rem(b),
        _ => None,
    };
    result.map(Value::Int).ok_or(EvalError::IntegerOverflow {
        operation: format!("{} {} {}", a, op.symbol(), b),
        location,
    })
}

fn arithmetic(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    if op == BinOp::Add {
        if let (Value::Str(_), _) | (_, Value::Str(_)) = (left, right) {
            return Ok(Value::Str(format!("{}{}", concat_text(left), concat_text(right))));
        }
    }

    let result = match promote(left, right) {
        Some(Promoted::Int(a, b)) => return checked_int(op, a, b, location),
        Some(Promoted::Float(a, b)) => Value::Float(match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            _ => a % b,
        }),
        Some(Promoted::Double(a, b)) => Value::Double(match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            _ => a % b,
        }),
        None => return Err(EvalError::invalid_operands(op.symbol(), &[left, right], location)),
    };
    Ok(result)
}

/// `null` concatenates as the empty string.
fn concat_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn ordering(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    let ord = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match promote(left, right) {
            Some(Promoted::Int(a, b)) => Some(a.cmp(&b)),
            Some(Promoted::Float(a, b)) => a.partial_cmp(&b),
            Some(Promoted::Double(a, b)) => a.partial_cmp(&b),
            None => return Err(EvalError::invalid_operands(op.symbol(), &[left, right], location)),
        },
    };
    // NaN compares false under every ordering operator
    let Some(ord) = ord else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Gt => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    }))
}

fn bitwise(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        return Ok(Value::Bool(match op {
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            _ => a ^ b,
        }));
    }
    if !is_integral(left) || !is_integral(right) {
        return Err(EvalError::invalid_operands(op.symbol(), &[left, right], location));
    }
    let (Some(a), Some(b)) = (left.to_i64(), right.to_i64()) else {
        return Err(EvalError::invalid_operands(op.symbol(), &[left, right], location));
    };
    Ok(Value::Int(match op {
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        _ => a ^ b,
    }))
}

fn shift(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (
        left.to_i64().filter(|_| is_integral(left)),
        right.to_i64().filter(|_| is_integral(right)),
    ) else {
        return Err(EvalError::invalid_operands(op.symbol(), &[left, right], location));
    };
    let amount = u32::try_from(b)
        .ok()
        .filter(|n| *n < i64::BITS)
        .ok_or(EvalError::IntegerOverflow {
            operation: format!("{} {} {}", a, op.symbol(), b),
            location,
        })?;
    Ok(Value::Int(if op == BinOp::Shl { a << amount } else { a >> amount }))
}

/// Apply `op` to two evaluated operands.
pub fn binary_values(op: BinOp, left: &Value, right: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic(op, left, right, location)
        }
        BinOp::Eq => Ok(Value::Bool(left.loose_eq(right))),
        BinOp::Ne => Ok(Value::Bool(!left.loose_eq(right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => ordering(op, left, right, location),
        BinOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => bitwise(op, left, right, location),
        BinOp::Shl | BinOp::Shr => shift(op, left, right, location),
    }
}

impl Evaluator<'_> {
    pub(crate) fn evaluate_binary_op(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let left_val = self.evaluate_expression(left)?;

        // Short-circuit
        match op {
            BinOp::And if !left_val.is_truthy() => return Ok(Value::Bool(false)),
            BinOp::Or if left_val.is_truthy() => return Ok(Value::Bool(true)),
            _ => {}
        }

        let right_val = self.evaluate_expression(right)?;
        binary_values(op, &left_val, &right_val, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: BinOp, left: Value, right: Value) -> Result<Value, EvalError> {
        binary_values(op, &left, &right, SourceLocation::default())
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(apply(BinOp::Add, Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(apply(BinOp::Mul, Value::Int(2), Value::Double(1.5)), Ok(Value::Double(3.0)));
        assert_eq!(apply(BinOp::Add, Value::Float(0.5), Value::Int(1)), Ok(Value::Float(1.5)));
        assert_eq!(apply(BinOp::Add, Value::Char('a'), Value::Int(1)), Ok(Value::Int(98)));
        assert_eq!(apply(BinOp::Div, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
    }

    #[test]
    fn test_integer_errors() {
        assert!(matches!(
            apply(BinOp::Div, Value::Int(1), Value::Int(0)),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert!(matches!(
            apply(BinOp::Mod, Value::Int(1), Value::Int(0)),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert!(matches!(
            apply(BinOp::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(EvalError::IntegerOverflow { .. })
        ));
        assert_eq!(
            apply(BinOp::Div, Value::Double(1.0), Value::Int(0)),
            Ok(Value::Double(f64::INFINITY))
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            apply(BinOp::Add, Value::Str("n = ".into()), Value::Int(4)),
            Ok(Value::Str("n = 4".into()))
        );
        assert_eq!(
            apply(BinOp::Add, Value::Null, Value::Str("x".into())),
            Ok(Value::Str("x".into()))
        );
        assert!(matches!(
            apply(BinOp::Sub, Value::Str("a".into()), Value::Int(1)),
            Err(EvalError::InvalidOperands { .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(apply(BinOp::Eq, Value::Int(2), Value::Double(2.0)), Ok(Value::Bool(true)));
        assert_eq!(apply(BinOp::Ne, Value::Str("a".into()), Value::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(apply(BinOp::Lt, Value::Int(2), Value::Double(2.5)), Ok(Value::Bool(true)));
        assert_eq!(
            apply(BinOp::Ge, Value::Str("b".into()), Value::Str("a".into())),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply(BinOp::Lt, Value::Double(f64::NAN), Value::Int(1)),
            Ok(Value::Bool(false))
        );
        assert!(apply(BinOp::Lt, Value::Bool(true), Value::Int(1)).is_err());
    }

    #[test]
    fn test_bitwise_and_shift() {
        assert_eq!(apply(BinOp::BitAnd, Value::Int(6), Value::Int(3)), Ok(Value::Int(2)));
        assert_eq!(apply(BinOp::BitXor, Value::Bool(true), Value::Bool(true)), Ok(Value::Bool(false)));
        assert_eq!(apply(BinOp::Shl, Value::Int(1), Value::Int(4)), Ok(Value::Int(16)));
        assert!(matches!(
            apply(BinOp::Shr, Value::Int(1), Value::Int(64)),
            Err(EvalError::IntegerOverflow { .. })
        ));
        assert!(apply(BinOp::BitOr, Value::Double(1.0), Value::Int(1)).is_err());
    }
}
