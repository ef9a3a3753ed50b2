//! Syntax tree definitions
//!
//! Expressions and statements are closed enums. Every [`Expr`] carries two
//! write-once slots the binder fills in place: the node's static type and its
//! [`Binding`]. Nodes whose meaning depends on overload resolution (calls,
//! operators, conversions) carry one more slot for the chosen target.

use crate::binder::binding::Binding;
use crate::binder::errors::BindError;
use crate::binder::overload::{BranchConversion, CallTarget, Conversion, OperatorTarget};
use crate::binder::types::Type;
use crate::interpreter::value::Value;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    /// Name of the overloadable operator method, `None` for `&&` and `||`.
    pub fn method_name(self) -> Option<&'static str> {
        Some(match self {
            BinOp::Add => "op_Addition",
            BinOp::Sub => "op_Subtraction",
            BinOp::Mul => "op_Multiply",
            BinOp::Div => "op_Division",
            BinOp::Mod => "op_Modulus",
            BinOp::Eq => "op_Equality",
            BinOp::Ne => "op_Inequality",
            BinOp::Lt => "op_LessThan",
            BinOp::Le => "op_LessThanOrEqual",
            BinOp::Gt => "op_GreaterThan",
            BinOp::Ge => "op_GreaterThanOrEqual",
            BinOp::BitAnd => "op_BitwiseAnd",
            BinOp::BitOr => "op_BitwiseOr",
            BinOp::BitXor => "op_ExclusiveOr",
            BinOp::Shl => "op_LeftShift",
            BinOp::Shr => "op_RightShift",
            BinOp::And | BinOp::Or => return None,
        })
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Parenthesized sub-expression
    Group,
    Neg,
    Plus,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnOp {
    pub fn method_name(self) -> Option<&'static str> {
        match self {
            UnOp::Group => None,
            UnOp::Neg => Some("op_UnaryNegation"),
            UnOp::Plus => Some("op_UnaryPlus"),
            UnOp::Not => Some("op_LogicalNot"),
            UnOp::PreInc | UnOp::PostInc => Some("op_Increment"),
            UnOp::PreDec | UnOp::PostDec => Some("op_Decrement"),
        }
    }

    /// Increment and decrement write back to their operand.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }
}

/// A type as written in source: `name` (possibly dotted) plus `[]` suffixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub name: String,
    pub rank: usize,
    pub location: SourceLocation,
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, "[]".repeat(self.rank))
    }
}

/// Function or lambda parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<TypeAnnotation>,
}

/// Header of a named function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub location: SourceLocation,
}

/// Expression node
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    resolved_type: OnceCell<Type>,
    binding: OnceCell<Binding>,
}

/// Expression variants
#[derive(Debug)]
pub enum ExprKind {
    Literal(Value),
    Identifier(String),
    /// `@name`
    VariableRef(String),
    /// `_name`
    ConstantRef(String),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        target: OnceCell<OperatorTarget>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        target: OnceCell<OperatorTarget>,
    },
    /// `left ?? right`
    NullCoalesce {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        conversion: OnceCell<BranchConversion>,
    },
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
        conversion: OnceCell<Option<Conversion>>,
    },
    Call {
        target: Box<Expr>,
        args: Vec<Expr>,
        resolved: OnceCell<CallTarget>,
    },
    New {
        target: Box<Expr>,
        args: Vec<Expr>,
        resolved: OnceCell<CallTarget>,
    },
    MemberAccess {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        args: Vec<Expr>,
        resolved: OnceCell<CallTarget>,
    },
    Declaration {
        name: String,
        annotation: Option<TypeAnnotation>,
        initializer: Option<Box<Expr>>,
        conversion: OnceCell<Option<Conversion>>,
    },
    ArrayLiteral {
        element_type: Option<TypeAnnotation>,
        items: Vec<Expr>,
        conversions: OnceCell<Vec<Option<Conversion>>>,
    },
    AnonymousFunction {
        params: Vec<Param>,
        body: Rc<Vec<Statement>>,
    },
    This,
    Null,
    Block(Vec<Statement>),
    /// Omitted element between two commas
    Empty,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Expr {
            kind,
            location,
            resolved_type: OnceCell::new(),
            binding: OnceCell::new(),
        }
    }

    pub fn literal(value: Value, location: SourceLocation) -> Self {
        Expr::new(ExprKind::Literal(value), location)
    }

    pub fn unary(op: UnOp, operand: Expr, location: SourceLocation) -> Self {
        Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
                target: OnceCell::new(),
            },
            location,
        )
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr, location: SourceLocation) -> Self {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                target: OnceCell::new(),
            },
            location,
        )
    }

    pub fn assignment(target: Expr, value: Expr, location: SourceLocation) -> Self {
        Expr::new(
            ExprKind::Assignment {
                target: Box::new(target),
                value: Box::new(value),
                conversion: OnceCell::new(),
            },
            location,
        )
    }

    pub fn resolved_type(&self) -> Option<&Type> {
        self.resolved_type.get()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.get()
    }

    /// Fill the type slot; a second write is an error.
    pub fn set_type(&self, ty: Type) -> Result<(), BindError> {
        self.resolved_type
            .set(ty)
            .map_err(|_| BindError::AlreadyResolved {
                location: self.location,
            })
    }

    /// Fill the binding slot; a second write is an error.
    pub fn set_binding(&self, binding: Binding) -> Result<(), BindError> {
        self.binding
            .set(binding)
            .map_err(|_| BindError::AlreadyResolved {
                location: self.location,
            })
    }

    /// Strip `Group` wrappers.
    pub fn ungrouped(&self) -> &Expr {
        match &self.kind {
            ExprKind::Unary {
                op: UnOp::Group,
                operand,
                ..
            } => operand.ungrouped(),
            _ => self,
        }
    }

    /// Name written by assignment-like forms (`x`, `@x`, `_x`).
    pub fn assignable_name(&self) -> Option<&str> {
        match &self.ungrouped().kind {
            ExprKind::Identifier(name)
            | ExprKind::VariableRef(name)
            | ExprKind::ConstantRef(name) => Some(name),
            _ => None,
        }
    }
}

/// Fill a node-specific target slot; a second write is an error.
pub fn set_slot<T>(slot: &OnceCell<T>, value: T, location: SourceLocation) -> Result<(), BindError> {
    slot.set(value)
        .map_err(|_| BindError::AlreadyResolved { location })
}

/// Statement node
#[derive(Debug)]
pub enum Statement {
    Expression(Expr),
    Block {
        statements: Vec<Statement>,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        conversion: OnceCell<Option<Conversion>>,
        location: SourceLocation,
    },
    Throw {
        value: Option<Expr>,
        location: SourceLocation,
    },
    VariableDeclaration {
        declarations: Vec<Expr>,
        location: SourceLocation,
    },
    FunctionDefinition {
        signature: Signature,
        body: Rc<Vec<Statement>>,
        location: SourceLocation,
    },
}

impl Statement {
    pub fn return_value(value: Option<Expr>, location: SourceLocation) -> Self {
        Statement::Return {
            value,
            conversion: OnceCell::new(),
            location,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Statement::Expression(expr) => expr.location,
            Statement::Block { location, .. }
            | Statement::If { location, .. }
            | Statement::Return { location, .. }
            | Statement::Throw { location, .. }
            | Statement::VariableDeclaration { location, .. }
            | Statement::FunctionDefinition { location, .. } => *location,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", param.name)?;
        if let Some(annotation) = &param.annotation {
            write!(f, ": {}", annotation)?;
        }
    }
    Ok(())
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &[Statement]) -> fmt::Result {
    write!(f, "{{")?;
    for statement in body {
        write!(f, " {};", statement)?;
    }
    write!(f, " }}")
}

// Fully parenthesized rendering; the tree shape is visible in the output.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(Value::Str(s)) => write!(f, "`{}`", s),
            ExprKind::Literal(value) => write!(f, "{}", value),
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::VariableRef(name) => write!(f, "@{}", name),
            ExprKind::ConstantRef(name) => write!(f, "_{}", name),
            ExprKind::Unary { op, operand, .. } => match op {
                UnOp::Group => write!(f, "{}", operand),
                UnOp::Neg => write!(f, "(-{})", operand),
                UnOp::Plus => write!(f, "(+{})", operand),
                UnOp::Not => write!(f, "(!{})", operand),
                UnOp::PreInc => write!(f, "(++{})", operand),
                UnOp::PreDec => write!(f, "(--{})", operand),
                UnOp::PostInc => write!(f, "({}++)", operand),
                UnOp::PostDec => write!(f, "({}--)", operand),
            },
            ExprKind::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op.symbol(), right),
            ExprKind::NullCoalesce { left, right } => {
                write!(f, "({} ?? {})", left, right)
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => write!(f, "({} ? {} : {})", condition, then_branch, else_branch),
            ExprKind::Assignment { target, value, .. } => {
                write!(f, "({} = {})", target, value)
            }
            ExprKind::Call { target, args, .. } => {
                write!(f, "{}(", target)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::New { target, args, .. } => {
                write!(f, "new {}(", target)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::MemberAccess { target, name } => write!(f, "{}.{}", target, name),
            ExprKind::Index { target, args, .. } => {
                write!(f, "{}[", target)?;
                write_list(f, args)?;
                write!(f, "]")
            }
            ExprKind::Declaration {
                name,
                annotation,
                initializer,
                ..
            } => {
                write!(f, "var {}", name)?;
                if let Some(annotation) = annotation {
                    write!(f, ": {}", annotation)?;
                }
                if let Some(init) = initializer {
                    write!(f, " = {}", init)?;
                }
                Ok(())
            }
            ExprKind::ArrayLiteral {
                element_type,
                items,
                ..
            } => {
                if let Some(element) = element_type {
                    write!(f, "new {}[] ", element)?;
                }
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            ExprKind::AnonymousFunction { params, body } => {
                write!(f, "lambda(")?;
                write_params(f, params)?;
                write!(f, ") ")?;
                write_body(f, body)
            }
            ExprKind::This => write!(f, "this"),
            ExprKind::Null => write!(f, "null"),
            ExprKind::Block(statements) => write_body(f, statements),
            ExprKind::Empty => Ok(()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{}", expr),
            Statement::Block { statements, .. } => write_body(f, statements),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                write!(f, "if ({}) {}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            Statement::Return { value, .. } => match value {
                Some(value) => write!(f, "return {}", value),
                None => write!(f, "return"),
            },
            Statement::Throw { value, .. } => match value {
                Some(value) => write!(f, "throw {}", value),
                None => write!(f, "throw"),
            },
            Statement::VariableDeclaration { declarations, .. } => {
                for (i, declaration) in declarations.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", declaration)?;
                }
                Ok(())
            }
            Statement::FunctionDefinition {
                signature, body, ..
            } => {
                write!(f, "function {}(", signature.name)?;
                write_params(f, &signature.params)?;
                write!(f, ")")?;
                if let Some(ret) = &signature.return_type {
                    write!(f, ": {}", ret)?;
                }
                write!(f, " ")?;
                write_body(f, body)
            }
        }
    }
}
