// Integration tests for the script evaluator

use scriptc::interpreter::{Environment, EvalError, Evaluator, Value};
use scriptc::binder::emit::Instruction;
use scriptc::binder::types::TypeRegistry;
use scriptc::Error;

fn run(source: &str) -> Result<Value, Error> {
    let mut env = Environment::with_builtins();
    scriptc::run(source, &mut env)
}

#[test]
fn test_simple_arithmetic() {
    let mut env = Environment::with_builtins();
    let result = scriptc::run("var x = 2; x + 3 * 2", &mut env);

    assert_eq!(result, Ok(Value::Int(8)));
    assert_eq!(env.variable("x"), Some(&Value::Int(2)));
}

#[test]
fn test_mixed_numeric_promotion() {
    assert_eq!(run("7 / 2"), Ok(Value::Int(3)));
    assert_eq!(run("7 / 2.0"), Ok(Value::Double(3.5)));
    assert_eq!(run("var d: double = 7 / 2; d"), Ok(Value::Double(3.0)));
    assert_eq!(run("`n = ` + 4"), Ok(Value::Str("n = 4".into())));
}

#[test]
fn test_function_call() {
    let source = r#"
        function add(a, b) => a + b;
        add(3, 4)
    "#;
    assert_eq!(run(source), Ok(Value::Int(7)));
}

#[test]
fn test_recursive_function() {
    let source = r#"
        function fact(n: int): int {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }
        fact(6)
    "#;
    assert_eq!(run(source), Ok(Value::Int(720)));
}

#[test]
fn test_parts_by_arity_and_shadowing() {
    let source = r#"
        function f(a) => 1;
        function f(a, b) => 2;
        function f(a) => 3;
        f(0) + f(0, 0) * 10
    "#;
    assert_eq!(run(source), Ok(Value::Int(23)));

    let result = run("function g(a) => a; g()");
    assert!(matches!(
        result,
        Err(Error::Eval(EvalError::MissingFunctionPart { ref name, arity: 0, .. })) if name == "g"
    ));
}

#[test]
fn test_state_persists_across_runs() {
    let mut env = Environment::with_builtins();
    scriptc::run("@y ?? 5", &mut env).unwrap();
    assert_eq!(env.variable("y"), Some(&Value::Int(5)));

    assert_eq!(scriptc::run("@y ?? 7", &mut env), Ok(Value::Int(5)));
    assert_eq!(scriptc::run("@z ?? -1; z * 2", &mut env), Ok(Value::Int(-2)));
    assert_eq!(scriptc::run("function twice(v) => v * 2;", &mut env), Ok(Value::Null));
    assert_eq!(scriptc::run("twice(y)", &mut env), Ok(Value::Int(10)));
}

#[test]
fn test_constants_are_write_once() {
    let mut env = Environment::with_builtins();
    assert_eq!(scriptc::run("_Limit = 10; _Limit * 2", &mut env), Ok(Value::Int(20)));

    let err = scriptc::run("_Limit = 11", &mut env).unwrap_err();
    assert!(matches!(err, Error::Eval(EvalError::ConstantReassignment { .. })));
    assert_eq!(err.stage(), "runtime error");
    assert_eq!(env.constant("Limit"), Some(&Value::Int(10)));
}

#[test]
fn test_printed_output() {
    let mut env = Environment::with_builtins();
    let source = r#"
        var name = `world`;
        print(`hello`, name);
        print(name.ToUpper(), name.len);
    "#;
    scriptc::run(source, &mut env).unwrap();
    assert_eq!(env.take_output(), vec!["hello world", "WORLD 5"]);
    assert!(env.output().is_empty());
}

#[test]
fn test_arrays() {
    let source = r#"
        var grid = new int[] { 1, 2, 3 };
        grid[1] = grid[0] + grid[2];
        grid[1] * grid.Length
    "#;
    assert_eq!(run(source), Ok(Value::Int(12)));

    assert!(matches!(
        run("var a = [1, 2]; a[2]"),
        Err(Error::Eval(EvalError::IndexOutOfRange { index: 2, len: 2, .. }))
    ));
}

#[test]
fn test_errors_report_their_stage() {
    let err = run("(1 + 2").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert_eq!(err.stage(), "parse error");

    let err = run("1 / 0").unwrap_err();
    assert!(matches!(err, Error::Eval(EvalError::DivisionByZero { .. })));
    assert_eq!(err.stage(), "runtime error");

    let err = run("missing + 1").unwrap_err();
    assert!(matches!(err, Error::Eval(EvalError::UnboundIdentifier { .. })));
    assert_eq!(err.stage(), "runtime error");

    let err = run("throw `boom`").unwrap_err();
    assert!(matches!(err, Error::Eval(EvalError::Thrown { .. })));
}

#[test]
fn test_runaway_recursion_is_stopped() {
    let mut env = Environment::with_builtins();
    let program = scriptc::parse_program("function spin(n) => spin(n + 1); spin(0)").unwrap();

    let result = Evaluator::with_call_limit(&mut env, 32).execute_program(&program);
    assert!(matches!(result, Err(EvalError::RecursionLimit { limit: 32, .. })));
    assert_eq!(env.depth(), 1);
}

#[test]
fn test_compiled_functions_carry_their_bodies() {
    let program = scriptc::parse_program("function f(a: int): int => a + 1; f(2)").unwrap();
    let code = scriptc::compile(&program, &TypeRegistry::new(), None).expect("Compilation failed");

    let call = code.iter().position(|i| i.to_string() == "call script#0").unwrap();
    let body = code.iter().position(|i| *i == Instruction::Function(0)).unwrap();
    assert!(call < body);
    assert_eq!(code[body - 1], Instruction::Return);
    assert_eq!(code[body + 1], Instruction::LoadArgument(0));
    assert_eq!(code.last(), Some(&Instruction::Return));
    assert_eq!(code.iter().filter(|i| **i == Instruction::Return).count(), 2);
}
