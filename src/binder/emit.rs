//! Lowering bound trees into an instruction sink
//!
//! [`InstructionSink`] is the contract a code generator implements: loads and
//! stores, calls, numeric conversions, branches and boxing. [`Emitter`] walks
//! a tree the [`Binder`](crate::binder::Binder) has resolved and feeds the
//! sink; every decision it needs (which member, which operator, which
//! conversion) is read from the node slots, never recomputed.
//! [`RecordingSink`] keeps the instructions in a list.

use crate::binder::errors::EmitError;
use crate::binder::overload::{
    ArgumentConversions, Branch, BranchConversion, Callee, CallTarget, Conversion, OperatorKind,
};
use crate::binder::resolve::ScriptFunction;
use crate::binder::types::{FieldRef, MethodRef, PropertyRef, Type, TypeRegistry};
use crate::interpreter::value::Value;
use crate::parser::ast::{BinOp, Expr, ExprKind, Signature, SourceLocation, Statement, UnOp};
use std::fmt;

/// A jump target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCondition {
    Always,
    IfTrue,
    IfFalse,
    IfNotNull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Method(MethodRef),
    Constructor(MethodRef),
    DefaultConstructor(Type),
    /// Script-defined function by binder index
    Script(usize),
    Delegate {
        arity: usize,
    },
    PropertyGet(PropertyRef),
    PropertySet(PropertyRef),
}

/// Code generation target
pub trait InstructionSink {
    fn load_constant(&mut self, value: &Value);
    fn load_null(&mut self);
    fn load_local(&mut self, slot: usize);
    fn store_local(&mut self, slot: usize);
    fn load_argument(&mut self, index: usize);
    fn store_argument(&mut self, index: usize);
    fn load_this(&mut self);
    fn load_field(&mut self, field: &FieldRef, is_static: bool);
    fn store_field(&mut self, field: &FieldRef, is_static: bool);
    fn new_array(&mut self, element: &Type, len: usize);
    fn load_element(&mut self);
    fn store_element(&mut self);
    fn call(&mut self, invocation: &Invocation);
    fn convert_numeric(&mut self, from: &Type, to: &Type);
    fn reference_equals(&mut self, negate: bool);
    fn box_value(&mut self, ty: &Type);
    fn new_label(&mut self) -> Label;
    fn mark_label(&mut self, label: Label);
    fn branch(&mut self, condition: BranchCondition, target: Label);
    fn dup(&mut self);
    /// Copy the top value and insert the copy below the `depth` values
    /// under it.
    fn dup_under(&mut self, depth: usize);
    fn pop(&mut self);
    fn ret(&mut self);
    fn throw(&mut self);
    /// Start the body of script function `index`.
    fn begin_function(&mut self, index: usize);
}

/// Instructions as recorded by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    LoadConstant(Value),
    LoadNull,
    LoadLocal(usize),
    StoreLocal(usize),
    LoadArgument(usize),
    StoreArgument(usize),
    LoadThis,
    LoadField { field: FieldRef, is_static: bool },
    StoreField { field: FieldRef, is_static: bool },
    NewArray { element: Type, len: usize },
    LoadElement,
    StoreElement,
    Call(Invocation),
    ConvertNumeric { from: Type, to: Type },
    ReferenceEquals { negate: bool },
    Box(Type),
    Label(Label),
    Branch { condition: BranchCondition, target: Label },
    Dup,
    DupUnder(usize),
    Pop,
    Return,
    Throw,
    Function(usize),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadConstant(Value::Str(s)) => write!(f, "ldstr \"{}\"", s),
            Instruction::LoadConstant(value) => write!(f, "ldc {}", value),
            Instruction::LoadNull => write!(f, "ldnull"),
            Instruction::LoadLocal(slot) => write!(f, "ldloc {}", slot),
            Instruction::StoreLocal(slot) => write!(f, "stloc {}", slot),
            Instruction::LoadArgument(index) => write!(f, "ldarg {}", index),
            Instruction::StoreArgument(index) => write!(f, "starg {}", index),
            Instruction::LoadThis => write!(f, "ldarg this"),
            Instruction::LoadField { field, is_static } => {
                let op = if *is_static { "ldsfld" } else { "ldfld" };
                write!(f, "{} {}#{}", op, field.owner, field.index)
            }
            Instruction::StoreField { field, is_static } => {
                let op = if *is_static { "stsfld" } else { "stfld" };
                write!(f, "{} {}#{}", op, field.owner, field.index)
            }
            Instruction::NewArray { element, len } => write!(f, "newarr {} {}", element, len),
            Instruction::LoadElement => write!(f, "ldelem"),
            Instruction::StoreElement => write!(f, "stelem"),
            Instruction::Call(invocation) => match invocation {
                Invocation::Method(m) => write!(f, "call {}#{}", m.owner, m.index),
                Invocation::Constructor(m) => write!(f, "newobj {}#ctor{}", m.owner, m.index),
                Invocation::DefaultConstructor(ty) => write!(f, "newobj {}", ty),
                Invocation::Script(index) => write!(f, "call script#{}", index),
                Invocation::Delegate { arity } => write!(f, "invoke/{}", arity),
                Invocation::PropertyGet(p) => write!(f, "call {}#get{}", p.owner, p.index),
                Invocation::PropertySet(p) => write!(f, "call {}#set{}", p.owner, p.index),
            },
            Instruction::ConvertNumeric { from, to } => write!(f, "conv {} -> {}", from, to),
            Instruction::ReferenceEquals { negate: false } => write!(f, "ceq.ref"),
            Instruction::ReferenceEquals { negate: true } => write!(f, "cne.ref"),
            Instruction::Box(ty) => write!(f, "box {}", ty),
            Instruction::Label(label) => write!(f, "L{}:", label.0),
            Instruction::Branch { condition, target } => {
                let op = match condition {
                    BranchCondition::Always => "br",
                    BranchCondition::IfTrue => "brtrue",
                    BranchCondition::IfFalse => "brfalse",
                    BranchCondition::IfNotNull => "brnotnull",
                };
                write!(f, "{} L{}", op, target.0)
            }
            Instruction::Dup => write!(f, "dup"),
            Instruction::DupUnder(depth) => write!(f, "dup_x{}", depth),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Return => write!(f, "ret"),
            Instruction::Throw => write!(f, "throw"),
            Instruction::Function(index) => write!(f, ".function script#{}", index),
        }
    }
}

/// Sink that records every instruction
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub instructions: Vec<Instruction>,
    labels: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstructionSink for RecordingSink {
    fn load_constant(&mut self, value: &Value) {
        self.instructions.push(Instruction::LoadConstant(value.clone()));
    }
    fn load_null(&mut self) {
        self.instructions.push(Instruction::LoadNull);
    }
    fn load_local(&mut self, slot: usize) {
        self.instructions.push(Instruction::LoadLocal(slot));
    }
    fn store_local(&mut self, slot: usize) {
        self.instructions.push(Instruction::StoreLocal(slot));
    }
    fn load_argument(&mut self, index: usize) {
        self.instructions.push(Instruction::LoadArgument(index));
    }
    fn store_argument(&mut self, index: usize) {
        self.instructions.push(Instruction::StoreArgument(index));
    }
    fn load_this(&mut self) {
        self.instructions.push(Instruction::LoadThis);
    }
    fn load_field(&mut self, field: &FieldRef, is_static: bool) {
        self.instructions.push(Instruction::LoadField {
            field: field.clone(),
            is_static,
        });
    }
    fn store_field(&mut self, field: &FieldRef, is_static: bool) {
        self.instructions.push(Instruction::StoreField {
            field: field.clone(),
            is_static,
        });
    }
    fn new_array(&mut self, element: &Type, len: usize) {
        self.instructions.push(Instruction::NewArray {
            element: element.clone(),
            len,
        });
    }
    fn load_element(&mut self) {
        self.instructions.push(Instruction::LoadElement);
    }
    fn store_element(&mut self) {
        self.instructions.push(Instruction::StoreElement);
    }
    fn call(&mut self, invocation: &Invocation) {
        self.instructions.push(Instruction::Call(invocation.clone()));
    }
    fn convert_numeric(&mut self, from: &Type, to: &Type) {
        self.instructions.push(Instruction::ConvertNumeric {
            from: from.clone(),
            to: to.clone(),
        });
    }
    fn reference_equals(&mut self, negate: bool) {
        self.instructions.push(Instruction::ReferenceEquals { negate });
    }
    fn box_value(&mut self, ty: &Type) {
        self.instructions.push(Instruction::Box(ty.clone()));
    }
    fn new_label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels - 1)
    }
    fn mark_label(&mut self, label: Label) {
        self.instructions.push(Instruction::Label(label));
    }
    fn branch(&mut self, condition: BranchCondition, target: Label) {
        self.instructions.push(Instruction::Branch { condition, target });
    }
    fn dup(&mut self) {
        self.instructions.push(Instruction::Dup);
    }
    fn dup_under(&mut self, depth: usize) {
        self.instructions.push(Instruction::DupUnder(depth));
    }
    fn pop(&mut self) {
        self.instructions.push(Instruction::Pop);
    }
    fn ret(&mut self) {
        self.instructions.push(Instruction::Return);
    }
    fn throw(&mut self) {
        self.instructions.push(Instruction::Throw);
    }
    fn begin_function(&mut self, index: usize) {
        self.instructions.push(Instruction::Function(index));
    }
}

/// Walks bound trees and materializes them into a sink
pub struct Emitter<'a> {
    registry: &'a TypeRegistry,
    sink: &'a mut dyn InstructionSink,
}

impl<'a> Emitter<'a> {
    pub fn new(registry: &'a TypeRegistry, sink: &'a mut dyn InstructionSink) -> Self {
        Emitter { registry, sink }
    }

    /// Emit a program body. The value of a trailing expression statement is
    /// boxed and returned.
    pub fn emit_program(&mut self, statements: &[Statement]) -> Result<(), EmitError> {
        let Some((last, rest)) = statements.split_last() else {
            self.sink.ret();
            return Ok(());
        };
        for statement in rest {
            self.emit_statement(statement)?;
        }
        match last {
            Statement::Expression(expr) if produces_value(expr) => {
                self.emit_expression(expr)?;
                let ty = bound_type(expr)?;
                if !ty.is_reference() {
                    self.sink.box_value(ty);
                }
            }
            other => self.emit_statement(other)?,
        }
        self.sink.ret();
        Ok(())
    }

    /// Emit the body of a script function.
    pub fn emit_function_body(&mut self, body: &[Statement]) -> Result<(), EmitError> {
        for statement in body {
            self.emit_statement(statement)?;
        }
        if !matches!(body.last(), Some(Statement::Return { .. })) {
            self.sink.ret();
        }
        Ok(())
    }

    /// Emit the body of every function in `functions`, each after a
    /// [`InstructionSink::begin_function`] marker. Bodies are found in
    /// `program` by the location of their definition.
    pub fn emit_functions(
        &mut self,
        program: &[Statement],
        functions: &[ScriptFunction],
    ) -> Result<(), EmitError> {
        let mut definitions = Vec::new();
        collect_definitions(program, &mut definitions);

        for (index, function) in functions.iter().enumerate() {
            let Some((_, body)) = definitions
                .iter()
                .find(|(signature, _)| signature.location == function.location)
            else {
                return Err(EmitError::Unbound {
                    location: function.location,
                });
            };
            self.sink.begin_function(index);
            self.emit_function_body(body)?;
        }
        Ok(())
    }

    pub fn emit_statement(&mut self, statement: &Statement) -> Result<(), EmitError> {
        match statement {
            Statement::Expression(expr) => {
                self.emit_expression(expr)?;
                if produces_value(expr) {
                    self.sink.pop();
                }
            }
            Statement::Block { statements, .. } => {
                for statement in statements {
                    self.emit_statement(statement)?;
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let else_label = self.sink.new_label();
                let end = self.sink.new_label();
                self.emit_expression(condition)?;
                self.sink.branch(BranchCondition::IfFalse, else_label);
                self.emit_statement(then_branch)?;
                self.sink.branch(BranchCondition::Always, end);
                self.sink.mark_label(else_label);
                if let Some(else_branch) = else_branch {
                    self.emit_statement(else_branch)?;
                }
                self.sink.mark_label(end);
            }
            Statement::Return {
                value, conversion, ..
            } => {
                if let Some(value) = value {
                    self.emit_expression(value)?;
                    if let Some(Some(conversion)) = conversion.get() {
                        self.apply_conversion(conversion);
                    }
                }
                self.sink.ret();
            }
            Statement::Throw { value, .. } => {
                match value {
                    Some(value) => self.emit_expression(value)?,
                    None => self.sink.load_null(),
                }
                self.sink.throw();
            }
            Statement::VariableDeclaration { declarations, .. } => {
                for declaration in declarations {
                    self.emit_expression(declaration)?;
                }
            }
            // Bodies are emitted separately through `emit_function_body`.
            Statement::FunctionDefinition { .. } => {}
        }
        Ok(())
    }

    /// Emit `expr`, leaving its value on the stack unless it is void or a
    /// declaration.
    pub fn emit_expression(&mut self, expr: &Expr) -> Result<(), EmitError> {
        let location = expr.location;

        match &expr.kind {
            ExprKind::Literal(Value::Null) | ExprKind::Null => self.sink.load_null(),
            ExprKind::Literal(value) => self.sink.load_constant(value),
            ExprKind::This => self.sink.load_this(),
            ExprKind::Identifier(_) | ExprKind::VariableRef(_) | ExprKind::ConstantRef(_) => {
                let binding = expr.binding().ok_or(EmitError::Unbound { location })?;
                if binding.needs_instance() {
                    self.sink.load_this();
                }
                binding.generate_get(self.sink, location)?;
            }
            ExprKind::MemberAccess { target, .. } => {
                let binding = expr.binding().ok_or(EmitError::Unbound { location })?;
                if binding.needs_instance() {
                    self.emit_expression(target)?;
                }
                binding.generate_get(self.sink, location)?;
            }
            ExprKind::Unary {
                op: UnOp::Group,
                operand,
                ..
            } => self.emit_expression(operand)?,
            ExprKind::Unary {
                op, operand, target, ..
            } => {
                let target = target.get().ok_or(EmitError::Unbound { location })?;
                let OperatorKind::Method(method) = &target.kind else {
                    return Err(unsupported("non-method unary operator", location));
                };
                if op.is_mutating() {
                    let binding = operand.binding().ok_or(EmitError::Unbound { location })?;
                    if binding.needs_instance() {
                        return Err(unsupported("increment of an instance member", location));
                    }
                    binding.generate_get(self.sink, location)?;
                    if matches!(op, UnOp::PostInc | UnOp::PostDec) {
                        self.sink.dup();
                        self.apply_conversions(&target.conversions, 0);
                        self.sink.call(&Invocation::Method(method.clone()));
                    } else {
                        self.apply_conversions(&target.conversions, 0);
                        self.sink.call(&Invocation::Method(method.clone()));
                        self.sink.dup();
                    }
                    binding.generate_set(self.sink, location)?;
                } else {
                    self.emit_expression(operand)?;
                    self.apply_conversions(&target.conversions, 0);
                    self.sink.call(&Invocation::Method(method.clone()));
                }
            }
            ExprKind::Binary {
                op,
                left,
                right,
                target,
            } => {
                let target = target.get().ok_or(EmitError::Unbound { location })?;
                match &target.kind {
                    OperatorKind::Method(method) => {
                        self.emit_expression(left)?;
                        self.apply_conversions(&target.conversions, 0);
                        self.emit_expression(right)?;
                        self.apply_conversions(&target.conversions, 1);
                        self.sink.call(&Invocation::Method(method.clone()));
                    }
                    OperatorKind::ReferenceEquality => {
                        self.emit_expression(left)?;
                        self.emit_expression(right)?;
                        self.sink.reference_equals(*op == BinOp::Ne);
                    }
                    OperatorKind::Logical => {
                        let end = self.sink.new_label();
                        let exit_on = if *op == BinOp::And {
                            BranchCondition::IfFalse
                        } else {
                            BranchCondition::IfTrue
                        };
                        self.emit_expression(left)?;
                        self.apply_conversions(&target.conversions, 0);
                        self.sink.dup();
                        self.sink.branch(exit_on, end);
                        self.sink.pop();
                        self.emit_expression(right)?;
                        self.apply_conversions(&target.conversions, 1);
                        self.sink.mark_label(end);
                    }
                    OperatorKind::Transparent => {
                        return Err(unsupported("transparent binary operator", location));
                    }
                }
            }
            ExprKind::NullCoalesce { left, right } => {
                let end = self.sink.new_label();
                self.emit_expression(left)?;
                self.sink.dup();
                self.sink.branch(BranchCondition::IfNotNull, end);
                self.sink.pop();
                self.emit_expression(right)?;
                self.sink.mark_label(end);
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                conversion,
            } => {
                let else_label = self.sink.new_label();
                let end = self.sink.new_label();
                self.emit_expression(condition)?;
                self.sink.branch(BranchCondition::IfFalse, else_label);
                self.emit_expression(then_branch)?;
                self.apply_branch_conversion(conversion.get(), Branch::Then);
                self.sink.branch(BranchCondition::Always, end);
                self.sink.mark_label(else_label);
                self.emit_expression(else_branch)?;
                self.apply_branch_conversion(conversion.get(), Branch::Else);
                self.sink.mark_label(end);
            }
            ExprKind::Assignment {
                target,
                value,
                conversion,
            } => self.emit_assignment(target, value, conversion.get().and_then(Option::as_ref))?,
            ExprKind::Call {
                target,
                args,
                resolved,
            } => {
                let resolved = resolved.get().ok_or(EmitError::Unbound { location })?;
                self.emit_call(target, args, resolved, location)?;
            }
            ExprKind::New { args, resolved, .. } => {
                let resolved = resolved.get().ok_or(EmitError::Unbound { location })?;
                self.emit_arguments(args, &resolved.conversions)?;
                match &resolved.callee {
                    Callee::Method(ctor) => self.sink.call(&Invocation::Constructor(ctor.clone())),
                    Callee::DefaultConstructor(ty) => {
                        self.sink.call(&Invocation::DefaultConstructor(ty.clone()))
                    }
                    _ => return Err(unsupported("constructor target", location)),
                }
            }
            ExprKind::Index {
                target,
                args,
                resolved,
            } => {
                let resolved = resolved.get().ok_or(EmitError::Unbound { location })?;
                self.emit_expression(target)?;
                self.emit_arguments(args, &resolved.conversions)?;
                match &resolved.callee {
                    Callee::ArrayElement => self.sink.load_element(),
                    Callee::Method(method) => self.sink.call(&Invocation::Method(method.clone())),
                    _ => return Err(unsupported("indexer target", location)),
                }
            }
            ExprKind::Declaration {
                initializer,
                conversion,
                ..
            } => {
                let binding = expr.binding().ok_or(EmitError::Unbound { location })?;
                if let Some(initializer) = initializer {
                    self.emit_expression(initializer)?;
                    if let Some(Some(conversion)) = conversion.get() {
                        self.apply_conversion(conversion);
                    }
                    binding.generate_set(self.sink, location)?;
                }
            }
            ExprKind::ArrayLiteral {
                items, conversions, ..
            } => {
                let ty = bound_type(expr)?;
                let element = ty.element_type().ok_or(EmitError::Unbound { location })?;
                let conversions = conversions.get().ok_or(EmitError::Unbound { location })?;
                self.sink.new_array(element, items.len());
                for (i, item) in items.iter().enumerate() {
                    self.sink.dup();
                    self.sink.load_constant(&Value::Int(i as i64));
                    self.emit_expression(item)?;
                    self.apply_conversions(conversions, i);
                    self.sink.store_element();
                }
            }
            ExprKind::Block(statements) => {
                let Some((last, rest)) = statements.split_last() else {
                    return Ok(());
                };
                for statement in rest {
                    self.emit_statement(statement)?;
                }
                match last {
                    Statement::Expression(value) => self.emit_expression(value)?,
                    other => self.emit_statement(other)?,
                }
            }
            ExprKind::AnonymousFunction { .. } => {
                return Err(unsupported("lambda expression", location));
            }
            ExprKind::Empty => return Err(unsupported("omitted expression", location)),
        }
        Ok(())
    }

    fn emit_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        conversion: Option<&Conversion>,
    ) -> Result<(), EmitError> {
        let location = target.location;
        let target = target.ungrouped();

        if let ExprKind::Index {
            target: array,
            args,
            resolved,
        } = &target.kind
        {
            let resolved = resolved.get().ok_or(EmitError::Unbound { location })?;
            self.emit_expression(array)?;
            self.emit_arguments(args, &resolved.conversions)?;
            self.emit_expression(value)?;
            if let Some(conversion) = conversion {
                self.apply_conversion(conversion);
            }
            // The result stays below the container and indices
            self.sink.dup_under(1 + args.len());
            self.sink.store_element();
            return Ok(());
        }

        let binding = target.binding().ok_or(EmitError::Unbound { location })?;
        if binding.needs_instance() {
            self.emit_owner(target)?;
            self.emit_expression(value)?;
            if let Some(conversion) = conversion {
                self.apply_conversion(conversion);
            }
            self.sink.dup_under(1);
            return binding.generate_set(self.sink, location);
        }

        self.emit_expression(value)?;
        if let Some(conversion) = conversion {
            self.apply_conversion(conversion);
        }
        self.sink.dup();
        binding.generate_set(self.sink, location)
    }

    fn emit_owner(&mut self, member: &Expr) -> Result<(), EmitError> {
        match &member.kind {
            ExprKind::MemberAccess { target, .. } => self.emit_expression(target),
            _ => {
                self.sink.load_this();
                Ok(())
            }
        }
    }

    fn emit_call(
        &mut self,
        target: &Expr,
        args: &[Expr],
        resolved: &CallTarget,
        location: SourceLocation,
    ) -> Result<(), EmitError> {
        match &resolved.callee {
            Callee::Method(method) => {
                let def = self
                    .registry
                    .method(method)
                    .ok_or(EmitError::Unbound { location })?;
                if !def.is_static {
                    self.emit_owner(target.ungrouped())?;
                }
                self.emit_arguments(args, &resolved.conversions)?;
                self.sink.call(&Invocation::Method(method.clone()));
            }
            Callee::Script(index) => {
                self.emit_arguments(args, &resolved.conversions)?;
                self.sink.call(&Invocation::Script(*index));
            }
            Callee::Delegate => {
                self.emit_expression(target)?;
                self.emit_arguments(args, &resolved.conversions)?;
                self.sink.call(&Invocation::Delegate { arity: args.len() });
            }
            Callee::ArrayElement | Callee::DefaultConstructor(_) => {
                return Err(unsupported("call target", location));
            }
        }
        Ok(())
    }

    /// Arguments in order, each followed by its recorded conversion.
    fn emit_arguments(&mut self, args: &[Expr], conversions: &ArgumentConversions) -> Result<(), EmitError> {
        for (i, arg) in args.iter().enumerate() {
            self.emit_expression(arg)?;
            self.apply_conversions(conversions, i);
        }
        Ok(())
    }

    fn apply_conversions(&mut self, conversions: &ArgumentConversions, index: usize) {
        if let Some(Some(conversion)) = conversions.get(index) {
            self.apply_conversion(conversion);
        }
    }

    fn apply_branch_conversion(
        &mut self,
        conversion: Option<&BranchConversion>,
        branch: Branch,
    ) {
        if let Some(recorded) = conversion.filter(|c| c.branch == branch) {
            if let Some(conversion) = &recorded.conversion {
                self.apply_conversion(conversion);
            }
        }
    }

    fn apply_conversion(&mut self, conversion: &Conversion) {
        if conversion.intrinsic {
            self.sink.convert_numeric(&conversion.from, &conversion.to);
        } else {
            self.sink.call(&Invocation::Method(conversion.method.clone()));
        }
    }
}

fn bound_type(expr: &Expr) -> Result<&Type, EmitError> {
    expr.resolved_type().ok_or(EmitError::Unbound {
        location: expr.location,
    })
}

/// Function definitions in `statements` and in every body nested inside them
fn collect_definitions<'s>(
    statements: &'s [Statement],
    out: &mut Vec<(&'s Signature, &'s [Statement])>,
) {
    for statement in statements {
        match statement {
            Statement::FunctionDefinition { signature, body, .. } => {
                out.push((signature, body.as_slice()));
                collect_definitions(body, out);
            }
            Statement::Block { statements, .. } => collect_definitions(statements, out),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_definitions(std::slice::from_ref(then_branch.as_ref()), out);
                if let Some(else_branch) = else_branch {
                    collect_definitions(std::slice::from_ref(else_branch.as_ref()), out);
                }
            }
            _ => {}
        }
    }
}

fn produces_value(expr: &Expr) -> bool {
    !matches!(expr.kind, ExprKind::Declaration { .. })
        && !matches!(expr.resolved_type(), Some(Type::Void) | None)
}

fn unsupported(what: &str, location: SourceLocation) -> EmitError {
    EmitError::Unsupported {
        what: what.to_string(),
        location,
    }
}
