//! Name/value environment for direct evaluation
//!
//! An [`Environment`] is a stack of frames. The bottom frame is the global
//! frame and is never popped. Each frame holds variables (`x`, `@x`),
//! constants (`_x`) and functions.
//!
//! # Visibility
//!
//! Lookups walk from the innermost frame outwards and stop at the nearest
//! function frame; the global frame is always visible after that. Code in a
//! function body therefore sees its own blocks, its own parameters and the
//! globals, but never the locals of its caller.
//!
//! # Writes
//!
//! - assignment writes into the innermost visible frame that already
//!   defines the name, and defines it in the innermost frame otherwise
//! - `var` always defines in the innermost frame, shadowing outer names
//! - a constant can be set once; one that holds `null` counts as unset

use crate::interpreter::builtins;
use crate::interpreter::errors::EvalError;
use crate::interpreter::functions::{Function, FunctionPart, FunctionScope};
use crate::interpreter::value::Value;
use crate::parser::ast::SourceLocation;
use rustc_hash::FxHashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Global,
    Block,
    Function,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    variables: FxHashMap<String, Value>,
    constants: FxHashMap<String, Value>,
    functions: FxHashMap<String, Function>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Frame {
            kind,
            variables: FxHashMap::default(),
            constants: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }

    /// Variables sorted by name
    pub fn variables(&self) -> Vec<(&str, &Value)> {
        sorted(&self.variables)
    }

    /// Constants sorted by name
    pub fn constants(&self) -> Vec<(&str, &Value)> {
        sorted(&self.constants)
    }

    /// Functions sorted by name
    pub fn functions(&self) -> Vec<&Function> {
        let mut functions: Vec<&Function> = self.functions.values().collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        functions
    }
}

fn sorted(map: &FxHashMap<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Frame>,
    output: Vec<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment with only an empty global frame.
    pub fn new() -> Self {
        Environment {
            frames: vec![Frame::new(FrameKind::Global)],
            output: Vec::new(),
        }
    }

    /// An environment whose global frame holds the builtin functions.
    pub fn with_builtins() -> Self {
        let mut env = Environment::new();
        builtins::register(&mut env);
        env
    }

    pub fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame::new(kind));
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn global(&self) -> &Frame {
        &self.frames[0]
    }

    /// Indices of the visible frames, innermost first.
    fn visible(&self) -> impl Iterator<Item = usize> {
        let boundary = self
            .frames
            .iter()
            .rposition(|f| f.kind == FrameKind::Function)
            .unwrap_or(0);
        (boundary..self.frames.len())
            .rev()
            .chain((boundary > 0).then_some(0))
    }

    fn innermost(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    // ===== Variables =====

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.visible().find_map(|i| self.frames[i].variables.get(name))
    }

    pub fn define_variable(&mut self, name: &str, value: Value) {
        trace!(name, %value, depth = self.frames.len(), "define variable");
        self.innermost().variables.insert(name.to_string(), value);
    }

    pub fn assign_variable(&mut self, name: &str, value: Value) {
        let owner = self
            .visible()
            .find(|&i| self.frames[i].variables.contains_key(name));
        match owner {
            Some(i) => {
                self.frames[i].variables.insert(name.to_string(), value);
            }
            None => self.define_variable(name, value),
        }
    }

    // ===== Constants =====

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.visible().find_map(|i| self.frames[i].constants.get(name))
    }

    pub fn set_constant(&mut self, name: &str, value: Value, location: SourceLocation) -> Result<(), EvalError> {
        let existing = self
            .visible()
            .find(|&i| self.frames[i].constants.contains_key(name));
        match existing {
            Some(i) if !self.frames[i].constants[name].is_null() => Err(EvalError::ConstantReassignment {
                name: name.to_string(),
                location,
            }),
            Some(i) => {
                self.frames[i].constants.insert(name.to_string(), value);
                Ok(())
            }
            None => {
                self.innermost().constants.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    // ===== Functions =====

    /// Add a part to `name` in the innermost frame.
    pub fn define_function(&mut self, name: &str, part: FunctionPart) {
        trace!(name, arity = %part.arity, scope = %part.scope, "define function part");
        self.innermost()
            .functions
            .entry(name.to_string())
            .or_insert_with(|| Function::new(name))
            .add(part);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.visible().any(|i| self.frames[i].functions.contains_key(name))
    }

    /// Select the part a call to `name` with `arity` arguments runs. Inner
    /// frames are searched first; a frame whose function has no matching
    /// part does not hide an outer one that has.
    pub fn function_part(
        &self,
        name: &str,
        arity: usize,
        scope: FunctionScope,
        location: SourceLocation,
    ) -> Result<FunctionPart, EvalError> {
        let mut defined = false;
        for i in self.visible() {
            if let Some(function) = self.frames[i].functions.get(name) {
                defined = true;
                if let Some(part) = function.select(arity, scope) {
                    return Ok(part.clone());
                }
            }
        }
        if defined {
            Err(EvalError::MissingFunctionPart {
                name: name.to_string(),
                arity,
                location,
            })
        } else {
            Err(EvalError::UndefinedFunction {
                name: name.to_string(),
                location,
            })
        }
    }

    /// Scope of a call made at the current position.
    pub fn call_scope(&self) -> FunctionScope {
        if self.frames.iter().any(|f| f.kind == FrameKind::Function) {
            FunctionScope::LOCAL
        } else {
            FunctionScope::GLOBAL
        }
    }

    // ===== Output =====

    pub fn print(&mut self, line: String) {
        self.output.push(line);
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_writes_to_defining_frame() {
        let mut env = Environment::new();
        env.define_variable("x", Value::Int(1));
        env.push_frame(FrameKind::Block);
        env.assign_variable("x", Value::Int(2));
        env.assign_variable("y", Value::Int(3));
        env.pop_frame();

        assert_eq!(env.variable("x"), Some(&Value::Int(2)));
        assert_eq!(env.variable("y"), None);
    }

    #[test]
    fn test_var_shadows_in_innermost_frame() {
        let mut env = Environment::new();
        env.define_variable("x", Value::Int(1));
        env.push_frame(FrameKind::Block);
        env.define_variable("x", Value::Int(5));
        assert_eq!(env.variable("x"), Some(&Value::Int(5)));
        env.pop_frame();
        assert_eq!(env.variable("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_function_frames_hide_caller_locals() {
        let mut env = Environment::new();
        env.define_variable("g", Value::Int(1));
        env.push_frame(FrameKind::Function);
        env.define_variable("caller", Value::Int(2));
        env.push_frame(FrameKind::Function);

        assert_eq!(env.variable("g"), Some(&Value::Int(1)));
        assert_eq!(env.variable("caller"), None);

        env.assign_variable("g", Value::Int(9));
        env.pop_frame();
        env.pop_frame();
        assert_eq!(env.variable("g"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_global_frame_is_never_popped() {
        let mut env = Environment::new();
        env.define_variable("x", Value::Int(1));
        env.pop_frame();
        assert_eq!(env.depth(), 1);
        assert_eq!(env.variable("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_constants_are_write_once() {
        let mut env = Environment::new();
        let loc = SourceLocation::default();
        env.set_constant("Pi", Value::Null, loc).unwrap();
        env.set_constant("Pi", Value::Double(2.5), loc).unwrap();
        assert!(matches!(
            env.set_constant("Pi", Value::Double(3.0), loc),
            Err(EvalError::ConstantReassignment { .. })
        ));
        assert_eq!(env.constant("Pi"), Some(&Value::Double(2.5)));
    }

    #[test]
    fn test_undefined_and_missing_parts_differ() {
        let env = Environment::with_builtins();
        let loc = SourceLocation::default();
        assert!(matches!(
            env.function_part("nope", 0, FunctionScope::GLOBAL, loc),
            Err(EvalError::UndefinedFunction { .. })
        ));
        assert!(matches!(
            env.function_part("len", 2, FunctionScope::GLOBAL, loc),
            Err(EvalError::MissingFunctionPart { arity: 2, .. })
        ));
        assert!(env.function_part("print", 5, FunctionScope::GLOBAL, loc).is_ok());
    }

    #[test]
    fn test_call_scope_tracks_function_frames() {
        let mut env = Environment::new();
        assert_eq!(env.call_scope(), FunctionScope::GLOBAL);
        env.push_frame(FrameKind::Function);
        env.push_frame(FrameKind::Block);
        assert_eq!(env.call_scope(), FunctionScope::LOCAL);
    }
}
