//! Assignment to names and elements
//!
//! Names follow the environment write rule. Element assignment reads the
//! container, replaces the element, and writes the container back through
//! its own target, so `grid[0][1] = 2` updates `grid`.

use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalError;
use crate::interpreter::ops::access::element_slot;
use crate::interpreter::value::Value;
use crate::parser::ast::*;
use tracing::trace;

impl Evaluator<'_> {
    pub(crate) fn assign_to_target(
        &mut self,
        target: &Expr,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), EvalError> {
        match &target.ungrouped().kind {
            ExprKind::Identifier(name) => {
                // A bare name that only exists as a constant writes the constant.
                if self.env.variable(name).is_none() && self.env.constant(name).is_some() {
                    return self.env.set_constant(name, value, location);
                }
                trace!(name = %name, %value, "assign");
                self.env.assign_variable(name, value);
                Ok(())
            }
            ExprKind::VariableRef(name) => {
                trace!(name = %name, %value, "assign");
                self.env.assign_variable(name, value);
                Ok(())
            }
            ExprKind::ConstantRef(name) => self.env.set_constant(name, value, location),
            ExprKind::Index {
                target: container,
                args,
                ..
            } => {
                let mut current = self.evaluate_expression(container)?;
                let index = self.evaluate_index_arg(args, location)?;
                match &mut current {
                    Value::Array(items) => {
                        let slot = element_slot(items.len(), index, location)?;
                        items[slot] = value;
                    }
                    Value::Str(s) => {
                        let Value::Char(c) = value else {
                            return Err(EvalError::invalid_operands("[]=", &[&value], location));
                        };
                        let mut chars: Vec<char> = s.chars().collect();
                        let slot = element_slot(chars.len(), index, location)?;
                        chars[slot] = c;
                        *s = chars.into_iter().collect();
                    }
                    other => return Err(EvalError::invalid_operands("[]=", &[other], location)),
                }
                self.assign_to_target(container, current, location)
            }
            _ => Err(EvalError::InvalidAssignmentTarget { location }),
        }
    }
}
