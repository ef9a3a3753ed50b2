//! Statement execution
//!
//! Every statement produces a [`Flow`]: `Normal` with the statement's value,
//! or `Return` while a `return` unwinds to the enclosing call. Blocks run in
//! their own frame; function definitions add a part to the innermost frame.

use crate::interpreter::engine::{Evaluator, Flow};
use crate::interpreter::environment::FrameKind;
use crate::interpreter::errors::EvalError;
use crate::interpreter::functions::{FunctionPart, FunctionScope};
use crate::interpreter::value::{Value, ValueKind};
use crate::parser::ast::*;
use std::rc::Rc;
use tracing::trace;

/// Value of an annotated declaration without an initializer
fn zero_value(kind: ValueKind) -> Value {
    match kind {
        ValueKind::Bool => Value::Bool(false),
        ValueKind::Int => Value::Int(0),
        ValueKind::Float => Value::Float(0.0),
        ValueKind::Double => Value::Double(0.0),
        ValueKind::Char => Value::Char('\0'),
        ValueKind::Null | ValueKind::Str | ValueKind::Array => Value::Null,
    }
}

/// Primitive kind named by a scalar annotation.
pub(crate) fn annotated_kind(annotation: Option<&TypeAnnotation>) -> Option<ValueKind> {
    annotation
        .filter(|a| a.rank == 0)
        .and_then(|a| ValueKind::from_type_name(&a.name))
}

impl Evaluator<'_> {
    pub fn execute_statements(&mut self, statements: &[Statement]) -> Result<Flow, EvalError> {
        let mut last = Value::Null;
        for statement in statements {
            match self.execute_statement(statement)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    pub fn execute_statement(&mut self, statement: &Statement) -> Result<Flow, EvalError> {
        match statement {
            Statement::Expression(expr) => Ok(Flow::Normal(self.evaluate_expression(expr)?)),

            Statement::Block { statements, .. } => {
                self.in_frame(FrameKind::Block, |evaluator| evaluator.execute_statements(statements))
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(Flow::Normal(Value::Null))
                }
            }

            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Statement::Throw { value, location } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => Value::Null,
                };
                Err(EvalError::Thrown {
                    value,
                    location: *location,
                })
            }

            Statement::VariableDeclaration { declarations, .. } => {
                let mut last = Value::Null;
                for declaration in declarations {
                    last = self.evaluate_expression(declaration)?;
                }
                Ok(Flow::Normal(last))
            }

            Statement::FunctionDefinition { signature, body, .. } => {
                self.define_script_function(signature, body);
                Ok(Flow::Normal(Value::Null))
            }
        }
    }

    fn define_script_function(&mut self, signature: &Signature, body: &Rc<Vec<Statement>>) {
        // Top-level parts are callable from anywhere; nested ones only from
        // inside a function body.
        let scope = if self.env.call_scope() == FunctionScope::GLOBAL {
            FunctionScope::ANY
        } else {
            FunctionScope::LOCAL
        };
        let params = signature.params.iter().map(|p| p.name.clone()).collect();
        trace!(name = %signature.name, %scope, "define script function");
        self.env
            .define_function(&signature.name, FunctionPart::script(params, body.clone(), scope));
    }

    pub(crate) fn evaluate_declaration(
        &mut self,
        name: &str,
        annotation: Option<&TypeAnnotation>,
        initializer: Option<&Expr>,
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        let kind = annotated_kind(annotation);
        let value = match initializer {
            Some(init) => {
                let value = self.evaluate_expression(init)?;
                match kind {
                    Some(kind) if !value.is_null() => value
                        .convert_to(kind)
                        .ok_or_else(|| EvalError::invalid_operands("=", &[&value], location))?,
                    _ => value,
                }
            }
            None => kind.map(zero_value).unwrap_or_default(),
        };
        self.env.define_variable(name, value.clone());
        Ok(value)
    }
}
