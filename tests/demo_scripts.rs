// Runs the scripts under demos/ and checks what they print

use scriptc::interpreter::{Environment, Value};
use std::fs;
use std::path::Path;

fn run_demo(name: &str) -> (Value, Vec<String>) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read demo script");

    let mut env = Environment::with_builtins();
    let result = scriptc::run(&source, &mut env)
        .unwrap_or_else(|err| panic!("{} failed: {} ({})", name, err, err.stage()));
    (result, env.take_output())
}

#[test]
fn test_arithmetic_demo() {
    let (result, output) = run_demo("arithmetic.sc");

    assert_eq!(
        output,
        vec![
            "Int / Int: 3",
            "Assigned to double: 3",
            "Int / Double: 3.5",
            "Char + Int: 98",
            "Modulo: 3",
            "Shift: 1024",
            "Concat: 7!",
            "Fallback: first",
            "Scaled: 21",
        ]
    );
    assert_eq!(result, Value::Int(7));
}

#[test]
fn test_overloads_demo() {
    let (result, output) = run_demo("overloads.sc");

    assert_eq!(output, vec!["latest: 1", "two: 1, 2", "total 15"]);
    assert_eq!(result, Value::Int(4));
}

#[test]
fn test_demos_parse() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    for entry in fs::read_dir(dir).expect("Failed to list demos") {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "sc") {
            let source = fs::read_to_string(&path).unwrap();
            assert!(
                scriptc::parse_program(&source).is_ok(),
                "{} does not parse",
                path.display()
            );
        }
    }
}
