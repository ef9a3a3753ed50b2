//! Type resolution
//!
//! The [`Binder`] walks a parsed tree bottom-up and fills every node's type
//! slot, the binding slot of names and member accesses, and the target slot
//! of calls, operators and conversions. The first failure aborts the pass.
//!
//! # Name lookup
//!
//! A bare identifier resolves, in order, to:
//! 1. a local of the current function (innermost block first)
//! 2. a parameter of the current function
//! 3. a field or property of the declaring type (name or alias)
//! 4. a type name, which binds to [`Binding::EmptyType`]
//!
//! `@name` stops after step 2; `_Name` only looks at static fields of the
//! declaring type. Function bodies do not see the locals of the code around
//! them.

use crate::binder::binding::{Binding, LocalSlot};
use crate::binder::errors::BindError;
use crate::binder::overload::{
    match_argument, method_candidates, select_overload, Branch, BranchConversion, CallTarget,
    Callee, Candidate, OperatorKind, OperatorTarget,
};
use crate::binder::types::{
    DelegateType, MemberHandle, MemberKinds, MethodRef, Type, TypeRegistry, INDEXER_GET,
};
use crate::interpreter::value::Value;
use crate::parser::ast::*;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// A script function registered by a `function` definition
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFunction {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub locals: Vec<LocalSlot>,
    pub location: SourceLocation,
}

#[derive(Debug)]
enum ReturnType {
    Declared(Type),
    Inferred(Option<Type>),
}

/// Binding state of one function body (or of the top-level program)
#[derive(Debug)]
struct Frame {
    params: Vec<(String, Type)>,
    scopes: Vec<FxHashMap<String, LocalSlot>>,
    locals: Vec<LocalSlot>,
    return_type: ReturnType,
}

impl Frame {
    fn new(params: Vec<(String, Type)>, return_type: ReturnType) -> Self {
        Frame {
            params,
            scopes: vec![FxHashMap::default()],
            locals: Vec::new(),
            return_type,
        }
    }

    fn lookup_local(&self, name: &str) -> Option<&LocalSlot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn declare_local(&mut self, name: &str, ty: Type) -> LocalSlot {
        let slot = LocalSlot {
            index: self.locals.len(),
            name: name.to_string(),
            ty,
        };
        self.locals.push(slot.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot.clone());
        }
        slot
    }
}

#[derive(Debug, Clone)]
enum CallKey {
    Method(MethodRef),
    Script(usize),
}

/// The type-resolution visitor
pub struct Binder<'r> {
    registry: &'r TypeRegistry,
    declaring_type: Option<Type>,
    frames: Vec<Frame>,
    functions: Vec<ScriptFunction>,
    function_names: FxHashMap<String, Vec<usize>>,
}

impl<'r> Binder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Binder {
            registry,
            declaring_type: None,
            frames: vec![Frame::new(Vec::new(), ReturnType::Inferred(None))],
            functions: Vec::new(),
            function_names: FxHashMap::default(),
        }
    }

    /// Bind as the body of a member of `declaring_type`: its fields and
    /// properties become visible by name, and `this` has its type.
    pub fn with_declaring_type(registry: &'r TypeRegistry, declaring_type: Type) -> Self {
        Binder {
            declaring_type: Some(declaring_type),
            ..Binder::new(registry)
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Locals of the top-level program in slot order.
    pub fn locals(&self) -> &[LocalSlot] {
        self.frames.first().map(|f| f.locals.as_slice()).unwrap_or(&[])
    }

    pub fn functions(&self) -> &[ScriptFunction] {
        &self.functions
    }

    /// Bind a whole program; the result is the type of its trailing
    /// expression statement, or `void`.
    pub fn bind_program(&mut self, statements: &[Statement]) -> Result<Type, BindError> {
        for statement in statements {
            self.bind_statement(statement)?;
        }
        Ok(trailing_type(statements))
    }

    pub fn bind_statement(&mut self, statement: &Statement) -> Result<(), BindError> {
        match statement {
            Statement::Expression(expr) => {
                self.bind_expression(expr)?;
            }
            Statement::Block { statements, .. } => {
                self.with_scope(|binder| {
                    statements.iter().try_for_each(|s| binder.bind_statement(s))
                })?;
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.expect_bool(condition)?;
                self.with_scope(|binder| binder.bind_statement(then_branch))?;
                if let Some(else_branch) = else_branch {
                    self.with_scope(|binder| binder.bind_statement(else_branch))?;
                }
            }
            Statement::Return {
                value,
                conversion,
                location,
            } => self.bind_return(value.as_ref(), conversion, *location)?,
            Statement::Throw { value, .. } => {
                if let Some(value) = value {
                    self.bind_expression(value)?;
                }
            }
            Statement::VariableDeclaration { declarations, .. } => {
                for declaration in declarations {
                    self.bind_expression(declaration)?;
                }
            }
            Statement::FunctionDefinition {
                signature, body, ..
            } => self.bind_function(signature, body)?,
        }
        Ok(())
    }

    /// Bind `expr` and its children, returning its type.
    pub fn bind_expression(&mut self, expr: &Expr) -> Result<Type, BindError> {
        let location = expr.location;

        let (ty, binding) = match &expr.kind {
            ExprKind::Literal(value) => (literal_type(value, location)?, None),
            ExprKind::Null => (Type::Null, None),
            ExprKind::This => match &self.declaring_type {
                Some(ty) => (ty.clone(), None),
                None => {
                    return Err(BindError::UnboundIdentifier {
                        name: "this".to_string(),
                        location,
                    })
                }
            },
            ExprKind::Identifier(name) => {
                let binding = self.resolve_identifier(name, location)?;
                (binding.ty().clone(), Some(binding))
            }
            ExprKind::VariableRef(name) => {
                let binding = self.resolve_variable(name).ok_or_else(|| {
                    BindError::UnboundIdentifier {
                        name: format!("@{}", name),
                        location,
                    }
                })?;
                (binding.ty().clone(), Some(binding))
            }
            ExprKind::ConstantRef(name) => {
                let binding = self.resolve_constant(name).ok_or_else(|| {
                    BindError::UnboundIdentifier {
                        name: format!("_{}", name),
                        location,
                    }
                })?;
                (binding.ty().clone(), Some(binding))
            }
            ExprKind::MemberAccess { target, name } => {
                let binding = self.bind_member_access(target, name, location)?;
                (binding.ty().clone(), Some(binding))
            }
            ExprKind::Unary {
                op, operand, target,
            } => self.bind_unary(*op, operand, target, location)?,
            ExprKind::Binary {
                op,
                left,
                right,
                target,
            } => (self.bind_binary(*op, left, right, target, location)?, None),
            ExprKind::NullCoalesce { left, right } => {
                let ty = self.bind_expression(left)?;
                self.bind_expression(right)?;
                (ty, None)
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                conversion,
            } => (
                self.bind_ternary(condition, then_branch, else_branch, conversion, location)?,
                None,
            ),
            ExprKind::Assignment {
                target,
                value,
                conversion,
            } => {
                let value_type = self.bind_expression(value)?;
                let target_type = self.bind_assignment_target(target, &value_type)?;
                let converted = match_argument(self.registry, &value_type, &target_type).ok_or(
                    BindError::TypeMismatch {
                        expected: target_type.clone(),
                        found: value_type,
                        location,
                    },
                )?;
                set_slot(conversion, converted, location)?;
                (target_type, None)
            }
            ExprKind::Call {
                target,
                args,
                resolved,
            } => {
                let call = self.bind_call(target, args, location)?;
                let ty = call.return_type.clone();
                set_slot(resolved, call, location)?;
                (ty, None)
            }
            ExprKind::New {
                target,
                args,
                resolved,
            } => {
                let call = self.bind_new(target, args, location)?;
                let ty = call.return_type.clone();
                set_slot(resolved, call, location)?;
                (ty, None)
            }
            ExprKind::Index {
                target,
                args,
                resolved,
            } => {
                let call = self.bind_index(target, args, location)?;
                let ty = call.return_type.clone();
                set_slot(resolved, call, location)?;
                (ty, None)
            }
            ExprKind::Declaration {
                name,
                annotation,
                initializer,
                conversion,
            } => {
                let slot = self.bind_declaration(
                    name,
                    annotation.as_ref(),
                    initializer.as_deref(),
                    conversion,
                    location,
                )?;
                (slot.ty.clone(), Some(Binding::Variable(slot)))
            }
            ExprKind::ArrayLiteral {
                element_type,
                items,
                conversions,
            } => (
                self.bind_array_literal(element_type.as_ref(), items, conversions, location)?,
                None,
            ),
            ExprKind::AnonymousFunction { params, body } => {
                (self.bind_lambda(params, body, location)?, None)
            }
            ExprKind::Block(statements) => {
                let ty = self.with_scope(|binder| {
                    for statement in statements {
                        binder.bind_statement(statement)?;
                    }
                    Ok(trailing_type(statements))
                })?;
                (ty, None)
            }
            ExprKind::Empty => return Err(unsupported("An omitted expression", location)),
        };

        expr.set_type(ty.clone())?;
        if let Some(binding) = binding {
            expr.set_binding(binding)?;
        }
        Ok(ty)
    }

    // ===== Names =====

    fn frame(&self) -> &Frame {
        // The top-level frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn resolve_variable(&self, name: &str) -> Option<Binding> {
        let frame = self.frame();
        if let Some(slot) = frame.lookup_local(name) {
            return Some(Binding::Variable(slot.clone()));
        }
        frame
            .params
            .iter()
            .position(|(param, _)| param == name)
            .map(|index| Binding::Parameter {
                index,
                ty: frame.params[index].1.clone(),
            })
    }

    fn resolve_constant(&self, name: &str) -> Option<Binding> {
        let declaring = self.declaring_type.as_ref()?;
        self.registry
            .find_members(declaring, name, MemberKinds::FIELD)
            .into_iter()
            .find_map(|member| match member {
                MemberHandle::Field(field) => {
                    let def = self.registry.field(&field)?;
                    def.is_static.then(|| Binding::Field {
                        ty: def.ty.clone(),
                        field,
                        is_static: true,
                    })
                }
                _ => None,
            })
    }

    /// Field or property of `ty` named `name`; `static_only` for type targets.
    fn resolve_member(&self, ty: &Type, name: &str, static_only: bool) -> Option<Binding> {
        self.registry
            .find_members(ty, name, MemberKinds::VALUE)
            .into_iter()
            .find_map(|member| match member {
                MemberHandle::Field(field) => {
                    let def = self.registry.field(&field)?;
                    (!static_only || def.is_static).then(|| Binding::Field {
                        ty: def.ty.clone(),
                        is_static: def.is_static,
                        field,
                    })
                }
                MemberHandle::Property(property) => {
                    let def = self.registry.property(&property)?;
                    (!static_only || def.is_static).then(|| Binding::Property {
                        ty: def.ty.clone(),
                        is_static: def.is_static,
                        writable: def.can_write,
                        property,
                    })
                }
                MemberHandle::Method(_) => None,
            })
    }

    fn resolve_identifier(&self, name: &str, location: SourceLocation) -> Result<Binding, BindError> {
        let binding = self
            .resolve_variable(name)
            .or_else(|| {
                let declaring = self.declaring_type.as_ref()?;
                self.resolve_member(declaring, name, false)
            })
            .or_else(|| self.registry.resolve_name(name).map(Binding::EmptyType));

        match binding {
            Some(binding) => {
                trace!(name = %name, %binding, "resolved identifier");
                Ok(binding)
            }
            None => Err(BindError::UnboundIdentifier {
                name: name.to_string(),
                location,
            }),
        }
    }

    fn resolve_annotation(&self, annotation: &TypeAnnotation) -> Result<Type, BindError> {
        let mut ty = self
            .registry
            .resolve_name(&annotation.name)
            .ok_or_else(|| BindError::UnknownType {
                name: annotation.name.clone(),
                location: annotation.location,
            })?;
        for _ in 0..annotation.rank {
            ty = Type::array_of(ty);
        }
        Ok(ty)
    }

    fn bind_member_access(&mut self, target: &Expr, name: &str, location: SourceLocation) -> Result<Binding, BindError> {
        let target_type = self.bind_expression(target)?;
        let static_only = matches!(target.binding(), Some(Binding::EmptyType(_)));
        self.resolve_member(&target_type, name, static_only)
            .ok_or_else(|| BindError::MissingMember {
                ty: target_type,
                name: name.to_string(),
                location,
            })
    }

    // ===== Operators =====

    fn bind_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        target: &std::cell::OnceCell<OperatorTarget>,
        location: SourceLocation,
    ) -> Result<(Type, Option<Binding>), BindError> {
        let operand_type = self.bind_expression(operand)?;

        let Some(method_name) = op.method_name() else {
            set_slot(target, OperatorTarget::transparent(), location)?;
            return Ok((operand_type, operand.binding().cloned()));
        };

        if op.is_mutating() && !operand.binding().is_some_and(Binding::is_settable) {
            return Err(BindError::NotAssignable { location });
        }

        let methods = self.registry.find_methods(&operand_type, method_name);
        if methods.is_empty() {
            return Err(BindError::OperatorNotFound {
                op: method_name.to_string(),
                left: operand_type,
                location,
            });
        }
        let candidates = method_candidates(self.registry, methods);
        let args = [operand_type];
        let (method, conversions) = select_overload(self.registry, method_name, candidates, &args, location)
            .map_err(|_| BindError::InvalidOperation {
                op: method_name.to_string(),
                operands: args.to_vec(),
                location,
            })?;
        let ty = self.method_return(&method, location)?;
        set_slot(
            target,
            OperatorTarget {
                kind: OperatorKind::Method(method),
                conversions,
            },
            location,
        )?;
        Ok((ty, None))
    }

    fn bind_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        target: &std::cell::OnceCell<OperatorTarget>,
        location: SourceLocation,
    ) -> Result<Type, BindError> {
        let left_type = self.bind_expression(left)?;
        let right_type = self.bind_expression(right)?;

        let Some(method_name) = op.method_name() else {
            // && and || take bool operands
            let mut conversions = Vec::with_capacity(2);
            for operand in [&left_type, &right_type] {
                let converted = match_argument(self.registry, operand, &Type::Bool).ok_or(
                    BindError::TypeMismatch {
                        expected: Type::Bool,
                        found: operand.clone(),
                        location,
                    },
                )?;
                conversions.push(converted);
            }
            set_slot(
                target,
                OperatorTarget {
                    kind: OperatorKind::Logical,
                    conversions,
                },
                location,
            )?;
            return Ok(Type::Bool);
        };

        let reference_equality = matches!(op, BinOp::Eq | BinOp::Ne)
            && left_type.is_reference()
            && right_type.is_reference();

        let methods = match (left_type.numeric_rank(), right_type.numeric_rank()) {
            // Both numeric: the wider operand's operators
            (Some(l), Some(r)) => {
                let wider = if l >= r { &left_type } else { &right_type };
                self.registry.find_methods(wider, method_name)
            }
            _ => {
                let mut methods = self.registry.find_methods(&left_type, method_name);
                if right_type != left_type {
                    methods.extend(self.registry.find_methods(&right_type, method_name));
                }
                methods
            }
        };

        if methods.is_empty() {
            if reference_equality {
                return self.reference_equality(target, location);
            }
            return Err(BindError::OperatorNotFound {
                op: op.symbol().to_string(),
                left: left_type,
                location,
            });
        }

        let candidates = method_candidates(self.registry, methods);
        let args = [left_type, right_type];
        match select_overload(self.registry, method_name, candidates, &args, location) {
            Ok((method, conversions)) => {
                let ty = self.method_return(&method, location)?;
                trace!(op = op.symbol(), %ty, "resolved operator");
                set_slot(
                    target,
                    OperatorTarget {
                        kind: OperatorKind::Method(method),
                        conversions,
                    },
                    location,
                )?;
                Ok(ty)
            }
            Err(_) if reference_equality => self.reference_equality(target, location),
            Err(_) => Err(BindError::InvalidOperation {
                op: op.symbol().to_string(),
                operands: args.to_vec(),
                location,
            }),
        }
    }

    fn reference_equality(
        &self,
        target: &std::cell::OnceCell<OperatorTarget>,
        location: SourceLocation,
    ) -> Result<Type, BindError> {
        set_slot(
            target,
            OperatorTarget {
                kind: OperatorKind::ReferenceEquality,
                conversions: vec![None, None],
            },
            location,
        )?;
        Ok(Type::Bool)
    }

    fn bind_ternary(
        &mut self,
        condition: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        conversion: &std::cell::OnceCell<BranchConversion>,
        location: SourceLocation,
    ) -> Result<Type, BindError> {
        self.expect_bool(condition)?;
        let then_type = self.bind_expression(then_branch)?;
        let else_type = self.bind_expression(else_branch)?;

        if then_type == else_type {
            return Ok(then_type);
        }
        if let Some(converted) = match_argument(self.registry, &then_type, &else_type) {
            set_slot(
                conversion,
                BranchConversion {
                    branch: Branch::Then,
                    conversion: converted,
                },
                location,
            )?;
            return Ok(else_type);
        }
        if let Some(converted) = match_argument(self.registry, &else_type, &then_type) {
            set_slot(
                conversion,
                BranchConversion {
                    branch: Branch::Else,
                    conversion: converted,
                },
                location,
            )?;
            return Ok(then_type);
        }
        Err(BindError::BranchTypeMismatch {
            then_type,
            else_type,
            location,
        })
    }

    fn expect_bool(&mut self, condition: &Expr) -> Result<(), BindError> {
        let ty = self.bind_expression(condition)?;
        if ty == Type::Bool {
            Ok(())
        } else {
            Err(BindError::TypeMismatch {
                expected: Type::Bool,
                found: ty,
                location: condition.location,
            })
        }
    }

    // ===== Assignment and declarations =====

    /// Bind an assignment target and return its type. A plain name that is
    /// not yet bound declares a local of the assigned value's type.
    fn bind_assignment_target(&mut self, target: &Expr, value_type: &Type) -> Result<Type, BindError> {
        let location = target.location;
        let inner = target.ungrouped();

        if let ExprKind::Identifier(name) | ExprKind::VariableRef(name) = &inner.kind {
            let known = match &inner.kind {
                ExprKind::VariableRef(_) => self.resolve_variable(name).is_some(),
                _ => self.resolve_identifier(name, location).is_ok(),
            };
            if !known {
                if matches!(value_type, Type::Void | Type::Null) {
                    return Err(BindError::InvalidDeclaration {
                        name: name.clone(),
                        location,
                    });
                }
                let slot = self.frame_mut().declare_local(name, value_type.clone());
                debug!(name = %name, ty = %slot.ty, index = slot.index, "implicit local");
            }
        }

        let ty = self.bind_expression(target)?;
        let assignable = match &inner.kind {
            ExprKind::Index { resolved, .. } => {
                matches!(resolved.get(), Some(CallTarget { callee: Callee::ArrayElement, .. }))
            }
            _ => inner.binding().is_some_and(Binding::is_settable),
        };
        if !assignable {
            return Err(BindError::NotAssignable { location });
        }
        Ok(ty)
    }

    fn bind_declaration(
        &mut self,
        name: &str,
        annotation: Option<&TypeAnnotation>,
        initializer: Option<&Expr>,
        conversion: &std::cell::OnceCell<Option<crate::binder::overload::Conversion>>,
        location: SourceLocation,
    ) -> Result<LocalSlot, BindError> {
        let declared = annotation.map(|a| self.resolve_annotation(a)).transpose()?;
        let initial = initializer.map(|init| self.bind_expression(init)).transpose()?;

        let (ty, converted) = match (declared, initial) {
            (Some(declared), Some(initial)) => {
                let converted = match_argument(self.registry, &initial, &declared).ok_or(
                    BindError::TypeMismatch {
                        expected: declared.clone(),
                        found: initial,
                        location,
                    },
                )?;
                (declared, converted)
            }
            (Some(declared), None) => (declared, None),
            (None, Some(initial)) if !matches!(initial, Type::Void | Type::Null) => (initial, None),
            _ => {
                return Err(BindError::InvalidDeclaration {
                    name: name.to_string(),
                    location,
                })
            }
        };
        set_slot(conversion, converted, location)?;

        let slot = self.frame_mut().declare_local(name, ty);
        debug!(name, ty = %slot.ty, index = slot.index, "declared local");
        Ok(slot)
    }

    fn bind_array_literal(
        &mut self,
        element_type: Option<&TypeAnnotation>,
        items: &[Expr],
        conversions: &std::cell::OnceCell<Vec<Option<crate::binder::overload::Conversion>>>,
        location: SourceLocation,
    ) -> Result<Type, BindError> {
        let declared = element_type.map(|a| self.resolve_annotation(a)).transpose()?;
        let item_types = self.bind_arguments(items)?;

        let element = match (declared, item_types.first()) {
            (Some(declared), _) => declared,
            (None, Some(first)) if *first != Type::Null => first.clone(),
            _ => return Err(unsupported("An untyped empty array literal", location)),
        };

        let mut recorded = Vec::with_capacity(items.len());
        for (item, ty) in items.iter().zip(&item_types) {
            let converted = match_argument(self.registry, ty, &element).ok_or(BindError::TypeMismatch {
                expected: element.clone(),
                found: ty.clone(),
                location: item.location,
            })?;
            recorded.push(converted);
        }
        set_slot(conversions, recorded, location)?;
        Ok(Type::array_of(element))
    }

    // ===== Calls =====

    fn bind_arguments(&mut self, args: &[Expr]) -> Result<Vec<Type>, BindError> {
        args.iter()
            .map(|arg| match arg.kind {
                ExprKind::Empty => Err(unsupported("An omitted argument", arg.location)),
                _ => self.bind_expression(arg),
            })
            .collect()
    }

    fn bind_call(&mut self, target: &Expr, args: &[Expr], location: SourceLocation) -> Result<CallTarget, BindError> {
        let arg_types = self.bind_arguments(args)?;

        match &target.ungrouped().kind {
            ExprKind::Identifier(name) if self.resolve_variable(name).is_none() => {
                let mut candidates = Vec::new();
                if let Some(declaring) = &self.declaring_type {
                    for method in self.registry.find_methods(declaring, name) {
                        if let Some(def) = self.registry.method(&method) {
                            candidates.push(Candidate {
                                params: def.params.clone(),
                                key: CallKey::Method(method),
                            });
                        }
                    }
                }
                for &index in self.function_names.get(name.as_str()).into_iter().flatten() {
                    candidates.push(Candidate {
                        key: CallKey::Script(index),
                        params: self.functions[index].params.clone(),
                    });
                }
                if candidates.is_empty() {
                    return Err(BindError::UnboundIdentifier {
                        name: name.clone(),
                        location: target.location,
                    });
                }
                let (key, conversions) = select_overload(self.registry, name, candidates, &arg_types, location)?;
                let (callee, return_type) = match key {
                    CallKey::Method(method) => {
                        let ret = self.method_return(&method, location)?;
                        (Callee::Method(method), ret)
                    }
                    CallKey::Script(index) => (Callee::Script(index), self.functions[index].ret.clone()),
                };
                debug!(name = %name, ?callee, "resolved call");
                Ok(CallTarget {
                    callee,
                    return_type,
                    conversions,
                })
            }
            ExprKind::MemberAccess { target: owner, name } => {
                let owner_type = self.bind_expression(owner)?;
                let static_only = matches!(owner.binding(), Some(Binding::EmptyType(_)));
                let methods: Vec<MethodRef> = self
                    .registry
                    .find_methods(&owner_type, name)
                    .into_iter()
                    .filter(|m| self.registry.method(m).is_some_and(|def| def.is_static == static_only))
                    .collect();
                if methods.is_empty() {
                    return Err(BindError::MissingMember {
                        ty: owner_type,
                        name: name.clone(),
                        location,
                    });
                }
                let candidates = method_candidates(self.registry, methods);
                let (method, conversions) = select_overload(self.registry, name, candidates, &arg_types, location)?;
                let return_type = self.method_return(&method, location)?;
                debug!(name = %name, owner = %owner_type, "resolved member call");
                Ok(CallTarget {
                    callee: Callee::Method(method),
                    return_type,
                    conversions,
                })
            }
            _ => {
                let target_type = self.bind_expression(target)?;
                let Type::Delegate(delegate) = &target_type else {
                    return Err(unsupported(&format!("Calling a value of type '{}'", target_type), location));
                };
                let candidates = vec![Candidate {
                    key: (),
                    params: delegate.params.clone(),
                }];
                let ((), conversions) = select_overload(self.registry, "delegate", candidates, &arg_types, location)?;
                Ok(CallTarget {
                    callee: Callee::Delegate,
                    return_type: delegate.ret.clone(),
                    conversions,
                })
            }
        }
    }

    fn bind_new(&mut self, target: &Expr, args: &[Expr], location: SourceLocation) -> Result<CallTarget, BindError> {
        let ty = match qualified_name(target).and_then(|name| self.registry.resolve_name(&name)) {
            Some(ty) => {
                target.set_type(ty.clone())?;
                target.set_binding(Binding::EmptyType(ty.clone()))?;
                ty
            }
            None => {
                let ty = self.bind_expression(target)?;
                if !matches!(target.binding(), Some(Binding::EmptyType(_))) {
                    return Err(BindError::UnknownType {
                        name: target.to_string(),
                        location: target.location,
                    });
                }
                ty
            }
        };

        let arg_types = self.bind_arguments(args)?;
        let constructors = self.registry.constructors(&ty);
        if constructors.is_empty() {
            if !arg_types.is_empty() {
                return Err(BindError::OverloadNotFound {
                    name: ty.to_string(),
                    arity: arg_types.len(),
                    location,
                });
            }
            return Ok(CallTarget {
                callee: Callee::DefaultConstructor(ty.clone()),
                return_type: ty,
                conversions: Vec::new(),
            });
        }

        let candidates = method_candidates(self.registry, constructors);
        let (ctor, conversions) = select_overload(self.registry, &ty.to_string(), candidates, &arg_types, location)?;
        Ok(CallTarget {
            callee: Callee::Method(ctor),
            return_type: ty,
            conversions,
        })
    }

    fn bind_index(&mut self, target: &Expr, args: &[Expr], location: SourceLocation) -> Result<CallTarget, BindError> {
        let target_type = self.bind_expression(target)?;
        let arg_types = self.bind_arguments(args)?;

        if let Some(element) = target_type.element_type() {
            let candidates = vec![Candidate {
                key: (),
                params: vec![Type::Int],
            }];
            let ((), conversions) = select_overload(self.registry, "[]", candidates, &arg_types, location)?;
            return Ok(CallTarget {
                callee: Callee::ArrayElement,
                return_type: element.clone(),
                conversions,
            });
        }

        let methods: Vec<MethodRef> = self
            .registry
            .find_methods(&target_type, INDEXER_GET)
            .into_iter()
            .filter(|m| self.registry.method(m).is_some_and(|def| !def.is_static))
            .collect();
        if methods.is_empty() {
            return Err(BindError::MissingMember {
                ty: target_type,
                name: INDEXER_GET.to_string(),
                location,
            });
        }
        let candidates = method_candidates(self.registry, methods);
        let (method, conversions) = select_overload(self.registry, INDEXER_GET, candidates, &arg_types, location)?;
        let return_type = self.method_return(&method, location)?;
        Ok(CallTarget {
            callee: Callee::Method(method),
            return_type,
            conversions,
        })
    }

    fn method_return(&self, method: &MethodRef, location: SourceLocation) -> Result<Type, BindError> {
        self.registry
            .method(method)
            .map(|def| def.ret.clone())
            .ok_or_else(|| unsupported("A dangling method handle", location))
    }

    // ===== Functions =====

    fn typed_params(&self, params: &[Param]) -> Result<Vec<(String, Type)>, BindError> {
        params
            .iter()
            .map(|param| {
                let annotation = param.annotation.as_ref().ok_or_else(|| BindError::InvalidDeclaration {
                    name: param.name.clone(),
                    location: SourceLocation::default(),
                })?;
                Ok((param.name.clone(), self.resolve_annotation(annotation)?))
            })
            .collect()
    }

    fn bind_function(&mut self, signature: &Signature, body: &[Statement]) -> Result<(), BindError> {
        let params = self.typed_params(&signature.params).map_err(|err| match err {
            BindError::InvalidDeclaration { name, .. } => BindError::InvalidDeclaration {
                name,
                location: signature.location,
            },
            other => other,
        })?;
        let param_types: Vec<Type> = params.iter().map(|(_, ty)| ty.clone()).collect();

        // A declared return type is registered before the body so the body
        // can call itself.
        let declared = signature
            .return_type
            .as_ref()
            .map(|a| self.resolve_annotation(a))
            .transpose()?;
        let early_index = declared.as_ref().map(|ret| {
            self.register_function(ScriptFunction {
                name: signature.name.clone(),
                params: param_types.clone(),
                ret: ret.clone(),
                locals: Vec::new(),
                location: signature.location,
            })
        });

        let return_type = match declared {
            Some(ret) => ReturnType::Declared(ret),
            None => ReturnType::Inferred(None),
        };
        self.frames.push(Frame::new(params, return_type));
        let result = body.iter().try_for_each(|s| self.bind_statement(s));
        let frame = self.frames.pop();
        result?;

        let Some(frame) = frame else {
            return Ok(());
        };
        let ret = match frame.return_type {
            ReturnType::Declared(ret) => ret,
            ReturnType::Inferred(ret) => ret.unwrap_or(Type::Void),
        };
        match early_index {
            Some(index) => self.functions[index].locals = frame.locals,
            None => {
                self.register_function(ScriptFunction {
                    name: signature.name.clone(),
                    params: param_types,
                    ret,
                    locals: frame.locals,
                    location: signature.location,
                });
            }
        }
        Ok(())
    }

    fn register_function(&mut self, function: ScriptFunction) -> usize {
        let index = self.functions.len();
        debug!(name = %function.name, index, ret = %function.ret, "registered script function");
        self.function_names
            .entry(function.name.clone())
            .or_default()
            .push(index);
        self.functions.push(function);
        index
    }

    fn bind_lambda(&mut self, params: &[Param], body: &[Statement], location: SourceLocation) -> Result<Type, BindError> {
        let params = self.typed_params(params).map_err(|err| match err {
            BindError::InvalidDeclaration { name, .. } => BindError::InvalidDeclaration { name, location },
            other => other,
        })?;
        let param_types = params.iter().map(|(_, ty)| ty.clone()).collect();

        self.frames.push(Frame::new(params, ReturnType::Inferred(None)));
        let result = body.iter().try_for_each(|s| self.bind_statement(s));
        let frame = self.frames.pop();
        result?;

        let ret = match frame.map(|f| f.return_type) {
            Some(ReturnType::Inferred(Some(ret))) | Some(ReturnType::Declared(ret)) => ret,
            _ => Type::Void,
        };
        Ok(Type::Delegate(Rc::new(DelegateType {
            params: param_types,
            ret,
        })))
    }

    fn bind_return(
        &mut self,
        value: Option<&Expr>,
        conversion: &std::cell::OnceCell<Option<crate::binder::overload::Conversion>>,
        location: SourceLocation,
    ) -> Result<(), BindError> {
        let value_type = match value {
            Some(value) => self.bind_expression(value)?,
            None => Type::Void,
        };

        let registry = self.registry;
        let frame = self.frame_mut();
        let expected = match &mut frame.return_type {
            ReturnType::Declared(ret) => ret.clone(),
            ReturnType::Inferred(slot @ None) => {
                *slot = Some(value_type.clone());
                return set_slot(conversion, None, location);
            }
            ReturnType::Inferred(Some(ret)) => ret.clone(),
        };

        let converted = if expected == Type::Void || value_type == Type::Void {
            (expected == value_type).then_some(None)
        } else {
            match_argument(registry, &value_type, &expected)
        };
        let converted = converted.ok_or(BindError::TypeMismatch {
            expected,
            found: value_type,
            location,
        })?;
        set_slot(conversion, converted, location)
    }

    fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, BindError>) -> Result<T, BindError> {
        self.frame_mut().scopes.push(FxHashMap::default());
        let result = f(self);
        self.frame_mut().scopes.pop();
        result
    }
}

fn literal_type(value: &Value, location: SourceLocation) -> Result<Type, BindError> {
    Ok(match value {
        Value::Null => Type::Null,
        Value::Bool(_) => Type::Bool,
        Value::Int(_) => Type::Int,
        Value::Float(_) => Type::Float,
        Value::Double(_) => Type::Double,
        Value::Char(_) => Type::Char,
        Value::Str(_) => Type::Str,
        Value::Array(_) => return Err(unsupported("An array constant", location)),
    })
}

/// Type of the trailing expression statement, else `void`.
fn trailing_type(statements: &[Statement]) -> Type {
    match statements.last() {
        Some(Statement::Expression(expr)) if !matches!(expr.kind, ExprKind::Declaration { .. }) => {
            expr.resolved_type().cloned().unwrap_or(Type::Void)
        }
        _ => Type::Void,
    }
}

/// `A.B.C` for a chain of identifiers and member accesses.
fn qualified_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Identifier(name) => Some(name.clone()),
        ExprKind::MemberAccess { target, name } => {
            let mut qualified = qualified_name(target)?;
            qualified.push('.');
            qualified.push_str(name);
            Some(qualified)
        }
        _ => None,
    }
}

fn unsupported(what: &str, location: SourceLocation) -> BindError {
    BindError::Unsupported {
        what: what.to_string(),
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::emit::{Emitter, Instruction, RecordingSink};
    use crate::binder::types::MethodDef;
    use crate::parser::Parser;

    fn parse(source: &str) -> Vec<Statement> {
        Parser::new(source).parse_program().unwrap()
    }

    fn bind(source: &str) -> Result<Type, BindError> {
        let registry = TypeRegistry::new();
        let program = parse(source);
        Binder::new(&registry).bind_program(&program)
    }

    fn last_expr(program: &[Statement]) -> &Expr {
        match program.last() {
            Some(Statement::Expression(expr)) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_declaration_then_arithmetic() {
        let registry = TypeRegistry::new();
        let program = parse("var x = 2; x + 3 * 2");
        let mut binder = Binder::new(&registry);
        assert_eq!(binder.bind_program(&program).unwrap(), Type::Int);

        assert_eq!(binder.locals().len(), 1);
        assert_eq!(binder.locals()[0].name, "x");
        assert_eq!(binder.locals()[0].ty, Type::Int);

        let ExprKind::Binary { left, .. } = &last_expr(&program).kind else {
            panic!("expected a binary node");
        };
        assert!(matches!(left.binding(), Some(Binding::Variable(slot)) if slot.index == 0));
    }

    #[test]
    fn test_mixed_arithmetic_widens_left_operand() {
        let registry = TypeRegistry::new();
        let program = parse("1 + 2.5");
        assert_eq!(Binder::new(&registry).bind_program(&program).unwrap(), Type::Double);

        let ExprKind::Binary { target, .. } = &last_expr(&program).kind else {
            panic!("expected a binary node");
        };
        let target = target.get().unwrap();
        let widening = target.conversions[0].as_ref().unwrap();
        assert_eq!((&widening.from, &widening.to), (&Type::Int, &Type::Double));
        assert!(widening.intrinsic);
        assert!(target.conversions[1].is_none());
    }

    #[test]
    fn test_ternary_records_branch_conversion() {
        let registry = TypeRegistry::new();
        let program = parse("true ? 1 : 2.5");
        assert_eq!(Binder::new(&registry).bind_program(&program).unwrap(), Type::Double);

        let ExprKind::Ternary { conversion, .. } = &last_expr(&program).kind else {
            panic!("expected a conditional node");
        };
        let recorded = conversion.get().unwrap();
        assert_eq!(recorded.branch, Branch::Then);
        assert!(recorded.conversion.is_some());

        let program = parse("true ? 1 : 2");
        Binder::new(&registry).bind_program(&program).unwrap();
        let ExprKind::Ternary { conversion, .. } = &last_expr(&program).kind else {
            panic!("expected a conditional node");
        };
        assert!(conversion.get().is_none());
    }

    #[test]
    fn test_ternary_branch_mismatch() {
        assert!(matches!(
            bind("true ? 1 : `one`"),
            Err(BindError::BranchTypeMismatch {
                then_type: Type::Int,
                else_type: Type::Str,
                ..
            })
        ));
        assert!(matches!(
            bind("1 ? 1 : 2"),
            Err(BindError::TypeMismatch { expected: Type::Bool, .. })
        ));
    }

    #[test]
    fn test_member_aliases() {
        assert_eq!(bind("`abc`.len").unwrap(), Type::Int);
        assert_eq!(bind("`abc`.Length").unwrap(), Type::Int);
        assert_eq!(bind("`abc`.UPPER()").unwrap(), Type::Str);
        assert_eq!(bind("`abc`[0]").unwrap(), Type::Char);
        assert!(matches!(
            bind("`abc`.Size"),
            Err(BindError::MissingMember { ty: Type::Str, .. })
        ));
    }

    #[test]
    fn test_read_only_property_is_not_assignable() {
        assert!(matches!(
            bind("var s = `abc`; s.Length = 2"),
            Err(BindError::NotAssignable { .. })
        ));
    }

    #[test]
    fn test_unbound_and_operator_errors() {
        assert!(matches!(
            bind("@missing + 1"),
            Err(BindError::UnboundIdentifier { name, .. }) if name == "@missing"
        ));
        assert!(matches!(
            bind("`a` * 2"),
            Err(BindError::InvalidOperation { .. })
        ));
        assert!(matches!(
            bind("true << 1"),
            Err(BindError::InvalidOperation { .. })
        ));
        assert!(matches!(bind("-`a`"), Err(BindError::OperatorNotFound { .. })));
        assert!(matches!(bind("3++"), Err(BindError::NotAssignable { .. })));
    }

    #[test]
    fn test_declarations_need_a_type() {
        assert!(matches!(
            bind("var x"),
            Err(BindError::InvalidDeclaration { name, .. }) if name == "x"
        ));
        assert!(matches!(
            bind("var x = null"),
            Err(BindError::InvalidDeclaration { .. })
        ));
        assert_eq!(bind("var s: string = null; s").unwrap(), Type::Str);
        assert_eq!(bind("var d: double = 1; d").unwrap(), Type::Double);
        assert!(matches!(
            bind("var i: int = 1.5"),
            Err(BindError::TypeMismatch { expected: Type::Int, found: Type::Double, .. })
        ));
        assert!(matches!(
            bind("var v: Vector = 1"),
            Err(BindError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_assignment_declares_missing_locals() {
        let registry = TypeRegistry::new();
        let program = parse("y = 4; y * 2");
        let mut binder = Binder::new(&registry);
        assert_eq!(binder.bind_program(&program).unwrap(), Type::Int);
        assert_eq!(binder.locals()[0].name, "y");
    }

    #[test]
    fn test_reference_equality_fallback() {
        let registry = TypeRegistry::new();
        let program = parse("var a = [1, 2]; a == null");
        assert_eq!(Binder::new(&registry).bind_program(&program).unwrap(), Type::Bool);
        let ExprKind::Binary { target, .. } = &last_expr(&program).kind else {
            panic!("expected a binary node");
        };
        assert_eq!(target.get().unwrap().kind, OperatorKind::ReferenceEquality);
    }

    #[test]
    fn test_array_literals_and_indexing() {
        assert_eq!(bind("[1, 2, 3]").unwrap(), Type::array_of(Type::Int));
        assert_eq!(bind("new double[] { 1, 2.5 }").unwrap(), Type::array_of(Type::Double));
        assert_eq!(bind("var a = [1, 2]; a[1] = 5").unwrap(), Type::Int);
        assert!(matches!(bind("[]"), Err(BindError::Unsupported { .. })));
        assert!(matches!(
            bind("[1, `two`]"),
            Err(BindError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_recursive_function_with_declared_return() {
        let registry = TypeRegistry::new();
        let program = parse(
            "function sum(n: int): int { return n < 1 ? 0 : n + sum(n - 1); } sum(3)",
        );
        let mut binder = Binder::new(&registry);
        assert_eq!(binder.bind_program(&program).unwrap(), Type::Int);
        assert_eq!(binder.functions().len(), 1);
        assert_eq!(binder.functions()[0].params, vec![Type::Int]);
    }

    #[test]
    fn test_function_return_is_inferred() {
        assert_eq!(bind("function half(x: double) => x / 2; half(3)").unwrap(), Type::Double);
        assert!(matches!(
            bind("function f(x) => x; f(1)"),
            Err(BindError::InvalidDeclaration { .. })
        ));
        assert!(matches!(
            bind("function f(): int { return `s`; }"),
            Err(BindError::TypeMismatch { expected: Type::Int, .. })
        ));
    }

    #[test]
    fn test_script_overloads_choose_most_specific() {
        let registry = TypeRegistry::new();
        let program = parse(
            "function pick(a: double): int => 1; function pick(a: int): int => 2; pick(3)",
        );
        Binder::new(&registry).bind_program(&program).unwrap();
        let ExprKind::Call { resolved, .. } = &last_expr(&program).kind else {
            panic!("expected a call node");
        };
        assert_eq!(resolved.get().unwrap().callee, Callee::Script(1));

        assert!(matches!(
            bind("function one(a: int) => a; one(1, 2)"),
            Err(BindError::OverloadNotFound { arity: 2, .. })
        ));
        assert!(matches!(
            bind("function one(a: int) => a; one(`x`)"),
            Err(BindError::ArgumentTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_lambda_has_delegate_type() {
        let ty = bind("var twice = lambda (x: int) => x * 2; twice(4)").unwrap();
        assert_eq!(ty, Type::Int);
    }

    #[test]
    fn test_declaring_type_members() {
        let mut registry = TypeRegistry::new();
        let point = registry.declare("Point");
        registry
            .type_def_mut(&point)
            .unwrap()
            .add_field("X", Type::Int)
            .add_static_field("Origin", Type::Int)
            .add_method(MethodDef::new("Scale", vec![Type::Double], Type::Double));

        let program = parse("X + _Origin");
        let mut binder = Binder::with_declaring_type(&registry, point.clone());
        assert_eq!(binder.bind_program(&program).unwrap(), Type::Int);

        let program = parse("Scale(X)");
        let mut binder = Binder::with_declaring_type(&registry, point.clone());
        assert_eq!(binder.bind_program(&program).unwrap(), Type::Double);

        let program = parse("this");
        let mut binder = Binder::with_declaring_type(&registry, point.clone());
        assert_eq!(binder.bind_program(&program).unwrap(), point);

        assert!(matches!(bind("this"), Err(BindError::UnboundIdentifier { .. })));
    }

    #[test]
    fn test_new_uses_declared_constructors() {
        let mut registry = TypeRegistry::new();
        let point = registry.declare("Point");
        registry.type_def_mut(&point).unwrap().add_constructor(vec![Type::Int, Type::Int]);
        let shape = registry.declare("Shape");

        let program = parse("new Point(1, 2)");
        assert_eq!(Binder::new(&registry).bind_program(&program).unwrap(), point);

        let program = parse("new Shape");
        assert_eq!(Binder::new(&registry).bind_program(&program).unwrap(), shape);
        let ExprKind::New { resolved, .. } = &last_expr(&program).kind else {
            panic!("expected a new node");
        };
        assert_eq!(resolved.get().unwrap().callee, Callee::DefaultConstructor(shape));

        let program = parse("new Point(1)");
        assert!(matches!(
            Binder::new(&registry).bind_program(&program),
            Err(BindError::OverloadNotFound { arity: 1, .. })
        ));
    }

    #[test]
    fn test_rebinding_is_rejected() {
        let registry = TypeRegistry::new();
        let program = parse("1 + 2");
        Binder::new(&registry).bind_program(&program).unwrap();
        assert!(matches!(
            Binder::new(&registry).bind_program(&program),
            Err(BindError::AlreadyResolved { .. })
        ));
    }

    #[test]
    fn test_emission_reads_recorded_slots() {
        let registry = TypeRegistry::new();
        let program = parse("var x = 2; x + 3 * 2");
        Binder::new(&registry).bind_program(&program).unwrap();

        let mut sink = RecordingSink::new();
        Emitter::new(&registry, &mut sink).emit_program(&program).unwrap();
        let code = &sink.instructions;
        assert_eq!(code.len(), 9);
        assert_eq!(code[0], Instruction::LoadConstant(Value::Int(2)));
        assert_eq!(code[1], Instruction::StoreLocal(0));
        assert_eq!(code[2], Instruction::LoadLocal(0));
        assert_eq!(code[7], Instruction::Box(Type::Int));
        assert_eq!(code[8], Instruction::Return);
    }

    #[test]
    fn test_index_assignment_evaluates_target_once() {
        let registry = TypeRegistry::new();
        let program = parse("var a = [1, 2]; var i = 0; a[i++] = 5");
        Binder::new(&registry).bind_program(&program).unwrap();

        let mut sink = RecordingSink::new();
        Emitter::new(&registry, &mut sink).emit_program(&program).unwrap();
        let code = &sink.instructions;
        let increments = code.iter().filter(|i| **i == Instruction::StoreLocal(1)).count();
        assert_eq!(increments, 2);

        let store = code.iter().rposition(|i| *i == Instruction::StoreElement).unwrap();
        assert_eq!(code[store - 1], Instruction::DupUnder(2));
        assert_eq!(code[store + 1], Instruction::Box(Type::Int));
        assert_eq!(code.iter().filter(|i| **i == Instruction::LoadLocal(0)).count(), 1);
    }

    #[test]
    fn test_emission_applies_widening() {
        let registry = TypeRegistry::new();
        let program = parse("1 + 2.5");
        Binder::new(&registry).bind_program(&program).unwrap();

        let mut sink = RecordingSink::new();
        Emitter::new(&registry, &mut sink).emit_program(&program).unwrap();
        let listing: Vec<String> = sink.instructions.iter().map(|i| i.to_string()).collect();
        assert_eq!(listing[0], "ldc 1");
        assert_eq!(listing[1], "conv int -> double");
        assert_eq!(listing[2], "ldc 2.5");
    }
}
