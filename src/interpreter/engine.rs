// Evaluation visitor for scripts

use crate::interpreter::constants::MAX_CALL_DEPTH;
use crate::interpreter::environment::{Environment, FrameKind};
use crate::interpreter::errors::EvalError;
use crate::interpreter::functions::PartBody;
use crate::interpreter::value::Value;
use crate::parser::ast::*;
use tracing::{debug, trace};

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Ran to completion; carries the statement's value
    Normal(Value),
    /// A `return` is unwinding to the enclosing call
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(value) | Flow::Return(value) => value,
        }
    }
}

/// Tree-walking evaluator over a borrowed [`Environment`]
pub struct Evaluator<'env> {
    pub(crate) env: &'env mut Environment,

    /// Script and native calls currently on the Rust stack
    depth: usize,

    call_limit: usize,
}

impl<'env> Evaluator<'env> {
    pub fn new(env: &'env mut Environment) -> Self {
        Self::with_call_limit(env, MAX_CALL_DEPTH)
    }

    pub fn with_call_limit(env: &'env mut Environment, call_limit: usize) -> Self {
        Evaluator {
            env,
            depth: 0,
            call_limit,
        }
    }

    pub fn environment(&self) -> &Environment {
        self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        self.env
    }

    /// Run `program` in the current frame. The result is the value of the
    /// last statement, or the value of a top-level `return`.
    pub fn execute_program(&mut self, program: &[Statement]) -> Result<Value, EvalError> {
        debug!(statements = program.len(), "executing program");
        Ok(self.execute_statements(program)?.into_value())
    }

    /// Run `f` inside a fresh frame of `kind`. The frame is popped on every
    /// exit path, errors included.
    pub(crate) fn in_frame<T>(
        &mut self,
        kind: FrameKind,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        self.env.push_frame(kind);
        let result = f(self);
        self.env.pop_frame();
        result
    }

    /// Call the part of `name` selected for `args.len()` arguments at the
    /// current call scope.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>, location: SourceLocation) -> Result<Value, EvalError> {
        let scope = self.env.call_scope();
        let part = self.env.function_part(name, args.len(), scope, location)?;

        if self.depth >= self.call_limit {
            return Err(EvalError::RecursionLimit {
                limit: self.call_limit,
                location,
            });
        }

        debug!(name, arity = args.len(), %scope, part_scope = %part.scope, "call");
        self.depth += 1;
        let result = match part.body {
            PartBody::Native(f) => f(self, &args, location),
            PartBody::Script { params, body } => self.in_frame(FrameKind::Function, |evaluator| {
                for (param, value) in params.iter().zip(args) {
                    evaluator.env.define_variable(param, value);
                }
                match evaluator.execute_statements(&body)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal(_) => Ok(Value::Null),
                }
            }),
        };
        self.depth -= 1;

        if let Ok(value) = &result {
            trace!(name, %value, "returned");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run_in(env: &mut Environment, source: &str) -> Result<Value, EvalError> {
        let program = Parser::new(source).parse_program().unwrap();
        Evaluator::new(env).execute_program(&program)
    }

    fn run(source: &str) -> Result<Value, EvalError> {
        run_in(&mut Environment::with_builtins(), source)
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(run("2 + 3 * 4"), Ok(Value::Int(14)));
        assert_eq!(run("8 - 3 - 2"), Ok(Value::Int(3)));
        assert_eq!(run("(2 + 3) * 4"), Ok(Value::Int(20)));
    }

    #[test]
    fn test_declaration_then_expression() {
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, "var x = 2; x + 3 * 2"), Ok(Value::Int(8)));
        assert_eq!(env.variable("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_null_coalesce_writes_back() {
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, "@y ?? 5"), Ok(Value::Int(5)));
        assert_eq!(env.variable("y"), Some(&Value::Int(5)));
        assert_eq!(run_in(&mut env, "@y ?? 7"), Ok(Value::Int(5)));
    }

    #[test]
    fn test_constants_are_write_once() {
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, "_limit = 3; _limit * 2"), Ok(Value::Int(6)));
        assert!(matches!(
            run_in(&mut env, "_limit = 4"),
            Err(EvalError::ConstantReassignment { .. })
        ));
        assert!(matches!(
            run_in(&mut env, "limit = 4"),
            Err(EvalError::ConstantReassignment { .. })
        ));
    }

    #[test]
    fn test_recursive_function() {
        let source = "function fact(n: int): int { if (n <= 1) return 1; return n * fact(n - 1); } fact(5)";
        assert_eq!(run(source), Ok(Value::Int(120)));
    }

    #[test]
    fn test_overload_by_arity() {
        let source = "function f(a) => `one`; function f(a, b) => `two`; f(1) + f(1, 2)";
        assert_eq!(run(source), Ok(Value::Str("onetwo".into())));
        assert!(matches!(
            run("function f(a) => a; f(1, 2, 3)"),
            Err(EvalError::MissingFunctionPart { arity: 3, .. })
        ));
        assert!(matches!(run("g()"), Err(EvalError::UndefinedFunction { .. })));
    }

    #[test]
    fn test_later_definition_shadows() {
        assert_eq!(
            run("function f() => 1; function f() => 2; f()"),
            Ok(Value::Int(2))
        );
    }

    #[test]
    fn test_function_frames_are_opaque() {
        let source = "var x = 1; function f() { var y = 2; return x + y; } f()";
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, source), Ok(Value::Int(3)));
        assert_eq!(env.variable("y"), None);
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_assignment_writes_outer_variable() {
        let mut env = Environment::with_builtins();
        let source = "var n = 1; function bump() { n = n + 1; } bump(); bump(); n";
        assert_eq!(run_in(&mut env, source), Ok(Value::Int(3)));
    }

    #[test]
    fn test_recursion_limit() {
        let program = Parser::new("function loop(n) => loop(n + 1); loop(0)")
            .parse_program()
            .unwrap();
        let mut env = Environment::with_builtins();
        let result = Evaluator::with_call_limit(&mut env, 16).execute_program(&program);
        assert!(matches!(result, Err(EvalError::RecursionLimit { limit: 16, .. })));
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_throw_carries_value() {
        match run("throw `bad input`") {
            Err(EvalError::Thrown { value, .. }) => assert_eq!(value, Value::Str("bad input".into())),
            other => panic!("Expected thrown error, got {:?}", other),
        }
        assert!(matches!(run("throw"), Err(EvalError::Thrown { value: Value::Null, .. })));
    }

    #[test]
    fn test_lambda_is_not_implemented() {
        assert!(matches!(
            run("lambda(a) => a"),
            Err(EvalError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_if_else_and_block() {
        assert_eq!(run("var a = 0; if (a) 1 else 2"), Ok(Value::Int(2)));
        assert_eq!(run("if (false) 1"), Ok(Value::Null));
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, "{ var inner = 1; inner }"), Ok(Value::Int(1)));
        assert_eq!(env.variable("inner"), None);
    }

    #[test]
    fn test_array_element_assignment() {
        let mut env = Environment::with_builtins();
        let source = "var grid = [[1, 2], [3, 4]]; grid[1][0] = 9; grid[1][0] + grid.len";
        assert_eq!(run_in(&mut env, source), Ok(Value::Int(11)));
        assert!(matches!(
            run_in(&mut env, "grid[5] = 1"),
            Err(EvalError::IndexOutOfRange { index: 5, len: 2, .. })
        ));
    }

    #[test]
    fn test_increment_writes_back() {
        let mut env = Environment::with_builtins();
        assert_eq!(run_in(&mut env, "var i = 1; i++"), Ok(Value::Int(1)));
        assert_eq!(run_in(&mut env, "++i"), Ok(Value::Int(3)));
        assert!(matches!(
            run_in(&mut env, "3++"),
            Err(EvalError::InvalidAssignmentTarget { .. })
        ));
    }

    #[test]
    fn test_typed_declarations() {
        let mut env = Environment::with_builtins();
        run_in(&mut env, "var d: double = 2, n: int, s: string").unwrap();
        assert_eq!(env.variable("d"), Some(&Value::Double(2.0)));
        assert_eq!(env.variable("n"), Some(&Value::Int(0)));
        assert_eq!(env.variable("s"), Some(&Value::Null));
    }

    #[test]
    fn test_builtins_print() {
        let mut env = Environment::with_builtins();
        run_in(&mut env, "print(`total`, 1 + 2)").unwrap();
        assert_eq!(env.output(), ["total 3"]);
    }

    #[test]
    fn test_string_members() {
        assert_eq!(run("`Script`.ToUpper()"), Ok(Value::Str("SCRIPT".into())));
        assert_eq!(run("`Script`.LEN"), Ok(Value::Int(6)));
        assert_eq!(run("`Script`[0]"), Ok(Value::Char('S')));
    }

    #[test]
    fn test_errors_pop_frames() {
        let mut env = Environment::with_builtins();
        let source = "function f() { var local = 1; return 1 / 0; } f()";
        assert!(matches!(
            run_in(&mut env, source),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert_eq!(env.depth(), 1);
        assert_eq!(env.variable("local"), None);
    }
}
