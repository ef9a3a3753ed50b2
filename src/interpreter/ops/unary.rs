//! Unary operator evaluation

use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalError;
use crate::interpreter::ops::binary::binary_values;
use crate::interpreter::value::Value;
use crate::parser::ast::*;

/// Apply a non-mutating unary operator to an evaluated operand.
pub fn unary_value(op: UnOp, operand: &Value, location: SourceLocation) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnOp::Group, value) => Ok(value.clone()),
        (UnOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::IntegerOverflow {
            operation: format!("-{}", n),
            location,
        }),
        (UnOp::Neg, Value::Char(c)) => Ok(Value::Int(-(*c as i64))),
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Neg, Value::Double(x)) => Ok(Value::Double(-x)),
        (UnOp::Plus, Value::Char(c)) => Ok(Value::Int(*c as i64)),
        (UnOp::Plus, Value::Int(_) | Value::Float(_) | Value::Double(_)) => Ok(operand.clone()),
        (UnOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnOp::PreInc | UnOp::PostInc, value) => step(value, BinOp::Add, location),
        (UnOp::PreDec | UnOp::PostDec, value) => step(value, BinOp::Sub, location),
        (op, value) => Err(EvalError::invalid_operands(symbol(op), &[value], location)),
    }
}

fn step(value: &Value, op: BinOp, location: SourceLocation) -> Result<Value, EvalError> {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Double(_) => binary_values(op, value, &Value::Int(1), location),
        Value::Char(c) => {
            let code = if op == BinOp::Add { *c as u32 + 1 } else { (*c as u32).wrapping_sub(1) };
            char::from_u32(code)
                .map(Value::Char)
                .ok_or_else(|| EvalError::invalid_operands(symbol_of(op), &[value], location))
        }
        other => Err(EvalError::invalid_operands(symbol_of(op), &[other], location)),
    }
}

fn symbol(op: UnOp) -> &'static str {
    match op {
        UnOp::Group => "()",
        UnOp::Neg => "-",
        UnOp::Plus => "+",
        UnOp::Not => "!",
        UnOp::PreInc | UnOp::PostInc => "++",
        UnOp::PreDec | UnOp::PostDec => "--",
    }
}

fn symbol_of(step: BinOp) -> &'static str {
    if step == BinOp::Add {
        "++"
    } else {
        "--"
    }
}

impl Evaluator<'_> {
    pub(crate) fn evaluate_unary_op(
        &mut self,
        op: UnOp,
        operand: &Expr,
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let value = self.evaluate_expression(operand)?;
        if !op.is_mutating() {
            return unary_value(op, &value, location);
        }

        let updated = unary_value(op, &value, location)?;
        self.assign_to_target(operand, updated.clone(), location)?;
        match op {
            UnOp::PostInc | UnOp::PostDec => Ok(value),
            _ => Ok(updated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: UnOp, operand: Value) -> Result<Value, EvalError> {
        unary_value(op, &operand, SourceLocation::default())
    }

    #[test]
    fn test_negation() {
        assert_eq!(apply(UnOp::Neg, Value::Int(5)), Ok(Value::Int(-5)));
        assert_eq!(apply(UnOp::Neg, Value::Double(0.5)), Ok(Value::Double(-0.5)));
        assert!(matches!(
            apply(UnOp::Neg, Value::Int(i64::MIN)),
            Err(EvalError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            apply(UnOp::Neg, Value::Str("a".into())),
            Err(EvalError::InvalidOperands { .. })
        ));
    }

    #[test]
    fn test_not_uses_truthiness() {
        assert_eq!(apply(UnOp::Not, Value::Bool(true)), Ok(Value::Bool(false)));
        assert_eq!(apply(UnOp::Not, Value::Int(0)), Ok(Value::Bool(true)));
        assert_eq!(apply(UnOp::Not, Value::Null), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_increment_steps() {
        assert_eq!(apply(UnOp::PreInc, Value::Int(1)), Ok(Value::Int(2)));
        assert_eq!(apply(UnOp::PostDec, Value::Double(1.5)), Ok(Value::Double(0.5)));
        assert_eq!(apply(UnOp::PreInc, Value::Char('a')), Ok(Value::Char('b')));
        assert!(apply(UnOp::PreInc, Value::Bool(true)).is_err());
    }
}
