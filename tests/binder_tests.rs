// Binding and emission through the public API

use scriptc::binder::emit::Instruction;
use scriptc::binder::types::{MethodDef, Type, TypeRegistry};
use scriptc::binder::BindError;
use scriptc::parser::ast::{ExprKind, Statement};
use scriptc::Error;

fn bind_source(source: &str) -> Result<Type, BindError> {
    let registry = TypeRegistry::new();
    let program = scriptc::parse_program(source).expect("Parsing failed");
    scriptc::bind(&program, &registry, None)
}

fn listing(source: &str, registry: &TypeRegistry, declaring_type: Option<Type>) -> Vec<String> {
    let program = scriptc::parse_program(source).expect("Parsing failed");
    scriptc::compile(&program, registry, declaring_type)
        .expect("Compilation failed")
        .iter()
        .map(|i| i.to_string())
        .collect()
}

#[test]
fn test_program_type_is_last_expression() {
    assert_eq!(bind_source("var x = 2; x + 3 * 2"), Ok(Type::Int));
    assert_eq!(bind_source("var x = 2; x * 1.5"), Ok(Type::Double));
    assert_eq!(bind_source("var x = 2;"), Ok(Type::Void));
    assert_eq!(bind_source("`a` + `b`"), Ok(Type::Str));
    assert_eq!(bind_source("1 < 2.5"), Ok(Type::Bool));
}

#[test]
fn test_bound_nodes_carry_types() {
    let registry = TypeRegistry::new();
    let program = scriptc::parse_program("var x = 2; x * 1.5").unwrap();
    scriptc::bind(&program, &registry, None).unwrap();

    let Some(Statement::Expression(expr)) = program.last() else {
        panic!("expected an expression statement");
    };
    assert_eq!(expr.resolved_type(), Some(&Type::Double));
    let ExprKind::Binary { left, right, .. } = &expr.kind else {
        panic!("expected a binary node");
    };
    assert_eq!(left.resolved_type(), Some(&Type::Int));
    assert_eq!(right.resolved_type(), Some(&Type::Double));
}

#[test]
fn test_widening_is_emitted() {
    let registry = TypeRegistry::new();
    let code = listing("1 + 2.5", &registry, None);
    assert_eq!(code[0], "ldc 1");
    assert_eq!(code[1], "conv int -> double");
    assert_eq!(code[2], "ldc 2.5");
    assert_eq!(code.last().map(String::as_str), Some("ret"));
}

#[test]
fn test_locals_are_emitted_by_slot() {
    let registry = TypeRegistry::new();
    let program = scriptc::parse_program("var a = 1; var b = a; b").unwrap();
    let code = scriptc::compile(&program, &registry, None).unwrap();

    assert!(code.contains(&Instruction::StoreLocal(0)));
    assert!(code.contains(&Instruction::StoreLocal(1)));
    assert!(code.contains(&Instruction::LoadLocal(1)));
}

#[test]
fn test_declaring_type_members_resolve() {
    let mut registry = TypeRegistry::new();
    let counter = registry.declare("Counter");
    registry
        .type_def_mut(&counter)
        .unwrap()
        .add_field("Count", Type::Int)
        .add_method(MethodDef::new("Scale", vec![Type::Double], Type::Double));

    let program = scriptc::parse_program("Scale(Count + 1)").unwrap();
    assert_eq!(scriptc::bind(&program, &registry, Some(counter.clone())), Ok(Type::Double));

    let code = listing("Count", &registry, Some(counter.clone()));
    assert_eq!(code[0], "ldarg this");
    assert_eq!(code[1], "ldfld Counter#0");

    let code = listing("Count = 3", &registry, Some(counter.clone()));
    assert_eq!(code, ["ldarg this", "ldc 3", "dup_x1", "stfld Counter#0", "box int", "ret"]);

    let program = scriptc::parse_program("Count").unwrap();
    assert!(matches!(
        scriptc::bind(&program, &registry, None),
        Err(BindError::UnboundIdentifier { .. })
    ));
}

#[test]
fn test_bind_failures_surface_as_errors() {
    let registry = TypeRegistry::new();
    let program = scriptc::parse_program("y * 2").unwrap();
    let err = scriptc::compile(&program, &registry, None).unwrap_err();
    assert!(matches!(err, Error::Bind(BindError::UnboundIdentifier { .. })));
    assert_eq!(err.stage(), "bind error");

    assert!(matches!(
        bind_source("true ? 1 : `one`"),
        Err(BindError::BranchTypeMismatch { .. })
    ));
    assert!(matches!(
        bind_source("var i: int = 2.5"),
        Err(BindError::TypeMismatch { expected: Type::Int, .. })
    ));
}
