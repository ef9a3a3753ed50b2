//! Expression evaluation
//!
//! Operators dispatch on the runtime tags of their operands (see
//! [`crate::interpreter::ops`]); the binder's resolved overloads are not
//! consulted here. Names read through the environment: a bare identifier
//! finds a variable first, then a constant. The sigil forms `@x` and `_x`
//! read as `null` while unset.

use crate::interpreter::engine::Evaluator;
use crate::interpreter::environment::FrameKind;
use crate::interpreter::errors::EvalError;
use crate::interpreter::statements::annotated_kind;
use crate::interpreter::value::Value;
use crate::parser::ast::*;

impl Evaluator<'_> {
    /// Evaluate an expression and return its value
    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let location = expr.location;

        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Null => Ok(Value::Null),

            ExprKind::Identifier(name) => self
                .env
                .variable(name)
                .or_else(|| self.env.constant(name))
                .cloned()
                .ok_or_else(|| EvalError::UnboundIdentifier {
                    name: name.clone(),
                    location,
                }),

            ExprKind::VariableRef(name) => Ok(self.env.variable(name).cloned().unwrap_or_default()),

            ExprKind::ConstantRef(name) => Ok(self.env.constant(name).cloned().unwrap_or_default()),

            ExprKind::Unary { op, operand, .. } => self.evaluate_unary_op(*op, operand, location),

            ExprKind::Binary {
                op, left, right, ..
            } => self.evaluate_binary_op(*op, left, right, location),

            ExprKind::NullCoalesce { left, right } => self.evaluate_null_coalesce(left, right, location),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.evaluate_expression(then_branch)
                } else {
                    self.evaluate_expression(else_branch)
                }
            }

            ExprKind::Assignment { target, value, .. } => {
                let value = self.evaluate_expression(value)?;
                self.assign_to_target(target, value.clone(), location)?;
                Ok(value)
            }

            ExprKind::Call { target, args, .. } => match &target.ungrouped().kind {
                ExprKind::Identifier(name) => {
                    let args = self.evaluate_arguments(args)?;
                    self.call_function(name, args, location)
                }
                ExprKind::MemberAccess {
                    target: receiver,
                    name,
                } => self.evaluate_method_call(receiver, name, args, location),
                _ => Err(EvalError::not_implemented("call through a computed target", location)),
            },

            ExprKind::New { .. } => Err(EvalError::not_implemented("object construction", location)),

            ExprKind::MemberAccess { target, name } => self.evaluate_member_access(target, name, location),

            ExprKind::Index { target, args, .. } => self.evaluate_index(target, args, location),

            ExprKind::Declaration {
                name,
                annotation,
                initializer,
                ..
            } => self.evaluate_declaration(name, annotation.as_ref(), initializer.as_deref(), location),

            ExprKind::ArrayLiteral {
                element_type,
                items,
                ..
            } => {
                let kind = annotated_kind(element_type.as_ref());
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.evaluate_expression(item)?;
                    let value = match kind {
                        Some(kind) if !value.is_null() => value
                            .convert_to(kind)
                            .ok_or_else(|| EvalError::invalid_operands("[]", &[&value], item.location))?,
                        _ => value,
                    };
                    values.push(value);
                }
                Ok(Value::Array(values))
            }

            ExprKind::AnonymousFunction { .. } => Err(EvalError::not_implemented("lambda expression", location)),

            ExprKind::This => Err(EvalError::not_implemented("'this' outside a declaring type", location)),

            ExprKind::Block(statements) => self.in_frame(FrameKind::Block, |evaluator| {
                Ok(evaluator.execute_statements(statements)?.into_value())
            }),

            // Omitted list element
            ExprKind::Empty => Ok(Value::Null),
        }
    }

    pub(crate) fn evaluate_arguments(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.evaluate_expression(arg)).collect()
    }

    /// `left ?? right`. A null name on the left receives the fallback.
    fn evaluate_null_coalesce(&mut self, left: &Expr, right: &Expr, location: SourceLocation) -> Result<Value, EvalError> {
        let current = self.evaluate_expression(left)?;
        if !current.is_null() {
            return Ok(current);
        }

        let fallback = self.evaluate_expression(right)?;
        if left.assignable_name().is_some() {
            self.assign_to_target(left, fallback.clone(), location)?;
        }
        Ok(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::parser::Parser;

    fn eval(env: &mut Environment, source: &str) -> Result<Value, EvalError> {
        let expr = Parser::new(source).parse_expression().unwrap();
        Evaluator::new(env).evaluate_expression(&expr)
    }

    #[test]
    fn test_identifier_lookup() {
        let mut env = Environment::new();
        env.define_variable("a", Value::Int(1));
        env.set_constant("B", Value::Int(2), SourceLocation::default()).unwrap();
        assert_eq!(eval(&mut env, "a + B"), Ok(Value::Int(3)));
        assert_eq!(eval(&mut env, "@missing"), Ok(Value::Null));
        assert_eq!(eval(&mut env, "_missing"), Ok(Value::Null));
        assert!(matches!(
            eval(&mut env, "missing"),
            Err(EvalError::UnboundIdentifier { .. })
        ));
    }

    #[test]
    fn test_short_circuit_skips_right() {
        let mut env = Environment::new();
        assert_eq!(eval(&mut env, "false && missing"), Ok(Value::Bool(false)));
        assert_eq!(eval(&mut env, "true || missing"), Ok(Value::Bool(true)));
        assert!(eval(&mut env, "true && missing").is_err());
    }

    #[test]
    fn test_ternary_and_coalesce() {
        let mut env = Environment::new();
        assert_eq!(eval(&mut env, "1 < 2 ? `yes` : `no`"), Ok(Value::Str("yes".into())));
        assert_eq!(eval(&mut env, "_pi ?? 3"), Ok(Value::Int(3)));
        assert_eq!(env.constant("pi"), Some(&Value::Int(3)));
        assert_eq!(eval(&mut env, "null ?? 4"), Ok(Value::Int(4)));
    }

    #[test]
    fn test_typed_array_literal() {
        let mut env = Environment::new();
        assert_eq!(
            eval(&mut env, "new double[] { 1, 2.5 }"),
            Ok(Value::Array(vec![Value::Double(1.0), Value::Double(2.5)]))
        );
        assert_eq!(
            eval(&mut env, "[1, `a`]"),
            Ok(Value::Array(vec![Value::Int(1), Value::Str("a".into())]))
        );
    }

    #[test]
    fn test_omitted_elements_are_null() {
        let mut env = Environment::with_builtins();
        assert_eq!(eval(&mut env, "[1,,2]"), Ok(Value::Array(vec![Value::Int(1), Value::Null, Value::Int(2)])));
        assert_eq!(eval(&mut env, "print(1,,2)"), Ok(Value::Null));
        assert_eq!(env.output(), ["1 null 2"]);
    }

    #[test]
    fn test_unsupported_forms() {
        let mut env = Environment::new();
        assert!(matches!(
            eval(&mut env, "new Point(1, 2)"),
            Err(EvalError::NotImplemented { .. })
        ));
        assert!(matches!(eval(&mut env, "this"), Err(EvalError::NotImplemented { .. })));
    }
}
