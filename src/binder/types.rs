//! Type model and member lookup
//!
//! [`Type`] is the static type the binder assigns to every node.
//! [`TypeRegistry`] owns one [`TypeDef`] per primitive and per host-declared
//! type, and answers the member queries the binder needs: fields and
//! properties by name or alias, methods by name, operator overloads
//! (`op_Addition`, ...) and implicit conversions (`op_Implicit`).
//!
//! # Member aliases
//!
//! Every member carries a [`MemberName`]: its declared name plus a list of
//! alternate names. A lookup matches the declared name exactly, or any alias
//! ignoring ASCII case. Each [`TypeDef`] keeps a lazily built name index,
//! constructed at most once per definition and dropped whenever a member is
//! added.

use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// Method name of implicit conversion operators
pub const IMPLICIT_CONVERSION: &str = "op_Implicit";

/// Method name of indexers
pub const INDEXER_GET: &str = "get_Item";

/// Static types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Type of the `null` literal, assignable to every reference type
    Null,
    Bool,
    Char,
    Int,
    Float,
    Double,
    Str,
    Array(Box<Type>),
    Named(NamedType),
    Delegate(Rc<DelegateType>),
}

/// A host-declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    pub id: usize,
    pub name: Rc<str>,
}

/// Signature of a lambda or other callable value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelegateType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    /// Widening rank of the primitive numeric types; `None` for everything else.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Int => Some(1),
            Type::Float => Some(2),
            Type::Double => Some(3),
            _ => None,
        }
    }

    /// Types whose values may be `null`
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Null | Type::Str | Type::Array(_) | Type::Named(_) | Type::Delegate(_)
        )
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Str => write!(f, "string"),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Named(named) => write!(f, "{}", named.name),
            Type::Delegate(delegate) => {
                write!(f, "(")?;
                for (i, param) in delegate.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") => {}", delegate.ret)
            }
        }
    }
}

/// Declared name of a member plus the alternate names it also answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberName {
    pub name: String,
    pub aliases: Vec<String>,
}

impl MemberName {
    pub fn new(name: impl Into<String>) -> Self {
        MemberName {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Exact match on the declared name, case-insensitive match on aliases.
    pub fn matches(&self, candidate: &str) -> bool {
        self.name == candidate
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(candidate))
    }

    fn index_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.name.to_ascii_lowercase())
            .chain(self.aliases.iter().map(|a| a.to_ascii_lowercase()))
    }
}

impl From<&str> for MemberName {
    fn from(name: &str) -> Self {
        MemberName::new(name)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: MemberName,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: MemberName,
    pub ty: Type,
    pub is_static: bool,
    pub can_write: bool,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: MemberName,
    pub params: Vec<Type>,
    pub ret: Type,
    pub is_static: bool,
    /// Primitive operators and widenings the emitter lowers to opcodes
    pub intrinsic: bool,
}

impl MethodDef {
    pub fn new(name: impl Into<MemberName>, params: Vec<Type>, ret: Type) -> Self {
        MethodDef {
            name: name.into(),
            params,
            ret,
            is_static: false,
            intrinsic: false,
        }
    }

    pub fn new_static(name: impl Into<MemberName>, params: Vec<Type>, ret: Type) -> Self {
        MethodDef {
            is_static: true,
            ..MethodDef::new(name, params, ret)
        }
    }

    fn intrinsic(name: &str, params: Vec<Type>, ret: Type) -> Self {
        MethodDef {
            intrinsic: true,
            ..MethodDef::new_static(name, params, ret)
        }
    }
}

impl From<String> for MemberName {
    fn from(name: String) -> Self {
        MemberName::new(name)
    }
}

/// Handle to a field of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: Type,
    pub index: usize,
}

/// Handle to a property of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    pub owner: Type,
    pub index: usize,
}

/// Handle to a method or constructor of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: Type,
    pub index: usize,
    pub constructor: bool,
}

/// Result of a member query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberHandle {
    Field(FieldRef),
    Property(PropertyRef),
    Method(MethodRef),
}

/// Member kind mask for [`TypeRegistry::find_members`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberKinds(u8);

impl MemberKinds {
    pub const FIELD: MemberKinds = MemberKinds(0b001);
    pub const PROPERTY: MemberKinds = MemberKinds(0b010);
    pub const METHOD: MemberKinds = MemberKinds(0b100);
    pub const VALUE: MemberKinds = MemberKinds(0b011);
    pub const ALL: MemberKinds = MemberKinds(0b111);

    pub fn contains(self, other: MemberKinds) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MemberKinds {
    type Output = MemberKinds;

    fn bitor(self, rhs: MemberKinds) -> MemberKinds {
        MemberKinds(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy)]
enum MemberSlot {
    Field(usize),
    Property(usize),
    Method(usize),
}

/// Definition of a primitive or host-declared type
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub ty: Type,
    pub fields: Vec<FieldDef>,
    pub properties: Vec<PropertyDef>,
    pub methods: Vec<MethodDef>,
    pub constructors: Vec<MethodDef>,
    member_index: OnceLock<FxHashMap<String, Vec<MemberSlot>>>,
}

impl TypeDef {
    fn new(ty: Type) -> Self {
        TypeDef {
            ty,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            member_index: OnceLock::new(),
        }
    }

    pub fn add_field(&mut self, name: impl Into<MemberName>, ty: Type) -> &mut Self {
        self.push_field(name.into(), ty, false)
    }

    pub fn add_static_field(&mut self, name: impl Into<MemberName>, ty: Type) -> &mut Self {
        self.push_field(name.into(), ty, true)
    }

    fn push_field(&mut self, name: MemberName, ty: Type, is_static: bool) -> &mut Self {
        self.fields.push(FieldDef {
            name,
            ty,
            is_static,
        });
        self.member_index.take();
        self
    }

    pub fn add_property(
        &mut self,
        name: impl Into<MemberName>,
        ty: Type,
        can_write: bool,
    ) -> &mut Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            ty,
            is_static: false,
            can_write,
        });
        self.member_index.take();
        self
    }

    pub fn add_method(&mut self, method: MethodDef) -> &mut Self {
        self.methods.push(method);
        self.member_index.take();
        self
    }

    pub fn add_constructor(&mut self, params: Vec<Type>) -> &mut Self {
        let ty = self.ty.clone();
        self.constructors.push(MethodDef::new_static(".ctor", params, ty));
        self
    }

    /// Declare a binary or unary operator overload (`op_Addition`, ...).
    pub fn add_operator(&mut self, name: &str, params: Vec<Type>, ret: Type) -> &mut Self {
        self.add_method(MethodDef::new_static(name, params, ret))
    }

    /// Declare an implicit conversion `from -> to`.
    pub fn add_implicit_conversion(&mut self, from: Type, to: Type) -> &mut Self {
        self.add_method(MethodDef::new_static(IMPLICIT_CONVERSION, vec![from], to))
    }

    fn index(&self) -> &FxHashMap<String, Vec<MemberSlot>> {
        self.member_index.get_or_init(|| {
            let mut index: FxHashMap<String, Vec<MemberSlot>> = FxHashMap::default();
            for (i, field) in self.fields.iter().enumerate() {
                for key in field.name.index_keys() {
                    index.entry(key).or_default().push(MemberSlot::Field(i));
                }
            }
            for (i, property) in self.properties.iter().enumerate() {
                for key in property.name.index_keys() {
                    index.entry(key).or_default().push(MemberSlot::Property(i));
                }
            }
            for (i, method) in self.methods.iter().enumerate() {
                for key in method.name.index_keys() {
                    index.entry(key).or_default().push(MemberSlot::Method(i));
                }
            }
            index
        })
    }
}

/// All types known to a binding pass
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    defs: FxHashMap<Type, TypeDef>,
    names: FxHashMap<String, Type>,
    next_id: usize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding the primitive types and their intrinsic operators.
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            defs: FxHashMap::default(),
            names: FxHashMap::default(),
            next_id: 0,
        };
        registry.register_primitives();
        registry
    }

    /// Declare a new named type and return it. Members are added through
    /// [`TypeRegistry::type_def_mut`].
    pub fn declare(&mut self, name: &str) -> Type {
        let ty = Type::Named(NamedType {
            id: self.next_id,
            name: Rc::from(name),
        });
        self.next_id += 1;
        self.defs.insert(ty.clone(), TypeDef::new(ty.clone()));
        self.names.insert(name.to_string(), ty.clone());
        ty
    }

    pub fn type_def(&self, ty: &Type) -> Option<&TypeDef> {
        self.defs.get(ty)
    }

    pub fn type_def_mut(&mut self, ty: &Type) -> Option<&mut TypeDef> {
        self.defs.get_mut(ty)
    }

    /// Look up a type by the name scripts write it with.
    pub fn resolve_name(&self, name: &str) -> Option<Type> {
        self.names.get(name).cloned()
    }

    pub fn field(&self, field: &FieldRef) -> Option<&FieldDef> {
        self.defs.get(&field.owner)?.fields.get(field.index)
    }

    pub fn property(&self, property: &PropertyRef) -> Option<&PropertyDef> {
        self.defs.get(&property.owner)?.properties.get(property.index)
    }

    pub fn method(&self, method: &MethodRef) -> Option<&MethodDef> {
        let def = self.defs.get(&method.owner)?;
        if method.constructor {
            def.constructors.get(method.index)
        } else {
            def.methods.get(method.index)
        }
    }

    /// All members of `ty` named `name` (or aliased to it) whose kind is in `kinds`,
    /// in declaration order: fields, then properties, then methods.
    pub fn find_members(&self, ty: &Type, name: &str, kinds: MemberKinds) -> Vec<MemberHandle> {
        let Some(def) = self.defs.get(ty) else {
            return Vec::new();
        };
        let Some(slots) = def.index().get(&name.to_ascii_lowercase()) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for slot in slots {
            match *slot {
                MemberSlot::Field(index)
                    if kinds.contains(MemberKinds::FIELD) && def.fields[index].name.matches(name) =>
                {
                    found.push(MemberHandle::Field(FieldRef {
                        owner: ty.clone(),
                        index,
                    }));
                }
                MemberSlot::Property(index)
                    if kinds.contains(MemberKinds::PROPERTY)
                        && def.properties[index].name.matches(name) =>
                {
                    found.push(MemberHandle::Property(PropertyRef {
                        owner: ty.clone(),
                        index,
                    }));
                }
                MemberSlot::Method(index)
                    if kinds.contains(MemberKinds::METHOD) && def.methods[index].name.matches(name) =>
                {
                    found.push(MemberHandle::Method(MethodRef {
                        owner: ty.clone(),
                        index,
                        constructor: false,
                    }));
                }
                _ => {}
            }
        }
        // An alias key can collide with another member's declared name.
        found.dedup();
        found
    }

    /// Methods of `ty` answering to `name`.
    pub fn find_methods(&self, ty: &Type, name: &str) -> Vec<MethodRef> {
        self.find_members(ty, name, MemberKinds::METHOD)
            .into_iter()
            .filter_map(|member| match member {
                MemberHandle::Method(method) => Some(method),
                _ => None,
            })
            .collect()
    }

    pub fn constructors(&self, ty: &Type) -> Vec<MethodRef> {
        self.defs
            .get(ty)
            .map(|def| {
                (0..def.constructors.len())
                    .map(|index| MethodRef {
                        owner: ty.clone(),
                        index,
                        constructor: true,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A single-step implicit conversion `from -> to`, declared on either side.
    pub fn implicit_conversion(&self, from: &Type, to: &Type) -> Option<MethodRef> {
        [from, to].into_iter().find_map(|owner| {
            self.find_methods(owner, IMPLICIT_CONVERSION)
                .into_iter()
                .find(|candidate| {
                    self.method(candidate)
                        .is_some_and(|m| m.params.len() == 1 && &m.params[0] == from && &m.ret == to)
                })
        })
    }

    fn primitive(&mut self, name: &str, ty: Type) -> &mut TypeDef {
        self.names.insert(name.to_string(), ty.clone());
        self.defs.entry(ty.clone()).or_insert_with(|| TypeDef::new(ty))
    }

    fn register_primitives(&mut self) {
        const ARITHMETIC: [&str; 5] = [
            "op_Addition",
            "op_Subtraction",
            "op_Multiply",
            "op_Division",
            "op_Modulus",
        ];
        const COMPARISON: [&str; 6] = [
            "op_Equality",
            "op_Inequality",
            "op_LessThan",
            "op_LessThanOrEqual",
            "op_GreaterThan",
            "op_GreaterThanOrEqual",
        ];
        const BITWISE: [&str; 3] = ["op_BitwiseAnd", "op_BitwiseOr", "op_ExclusiveOr"];
        const UNARY_NUMERIC: [&str; 4] = [
            "op_UnaryNegation",
            "op_UnaryPlus",
            "op_Increment",
            "op_Decrement",
        ];

        self.primitive("void", Type::Void);

        for ty in [Type::Int, Type::Float, Type::Double] {
            let name = ty.to_string();
            let def = self.primitive(&name, ty.clone());
            for op in ARITHMETIC {
                def.add_method(MethodDef::intrinsic(op, vec![ty.clone(), ty.clone()], ty.clone()));
            }
            for op in COMPARISON {
                def.add_method(MethodDef::intrinsic(op, vec![ty.clone(), ty.clone()], Type::Bool));
            }
            for op in UNARY_NUMERIC {
                def.add_method(MethodDef::intrinsic(op, vec![ty.clone()], ty.clone()));
            }
        }

        let int = self.primitive("int", Type::Int);
        for op in BITWISE.iter().chain(["op_LeftShift", "op_RightShift"].iter()) {
            int.add_method(MethodDef::intrinsic(op, vec![Type::Int, Type::Int], Type::Int));
        }
        int.add_method(MethodDef::intrinsic(IMPLICIT_CONVERSION, vec![Type::Int], Type::Float));
        int.add_method(MethodDef::intrinsic(IMPLICIT_CONVERSION, vec![Type::Int], Type::Double));

        self.primitive("float", Type::Float).add_method(MethodDef::intrinsic(
            IMPLICIT_CONVERSION,
            vec![Type::Float],
            Type::Double,
        ));

        let char_def = self.primitive("char", Type::Char);
        for op in COMPARISON {
            char_def.add_method(MethodDef::intrinsic(op, vec![Type::Char, Type::Char], Type::Bool));
        }
        for target in [Type::Int, Type::Float, Type::Double] {
            char_def.add_method(MethodDef::intrinsic(IMPLICIT_CONVERSION, vec![Type::Char], target));
        }

        let bool_def = self.primitive("bool", Type::Bool);
        for op in ["op_Equality", "op_Inequality"].iter().chain(BITWISE.iter()) {
            bool_def.add_method(MethodDef::intrinsic(op, vec![Type::Bool, Type::Bool], Type::Bool));
        }
        bool_def.add_method(MethodDef::intrinsic("op_LogicalNot", vec![Type::Bool], Type::Bool));

        let string = self.primitive("string", Type::Str);
        string
            .add_method(MethodDef::intrinsic("op_Addition", vec![Type::Str, Type::Str], Type::Str))
            .add_method(MethodDef::intrinsic("op_Equality", vec![Type::Str, Type::Str], Type::Bool))
            .add_method(MethodDef::intrinsic("op_Inequality", vec![Type::Str, Type::Str], Type::Bool))
            .add_property(MemberName::new("Length").with_alias("len"), Type::Int, false)
            .add_method(MethodDef::new(INDEXER_GET, vec![Type::Int], Type::Char))
            .add_method(MethodDef::new(MemberName::new("ToUpper").with_alias("upper"), vec![], Type::Str))
            .add_method(MethodDef::new(MemberName::new("ToLower").with_alias("lower"), vec![], Type::Str))
            .add_method(MethodDef::new("Substring", vec![Type::Int, Type::Int], Type::Str))
            .add_method(MethodDef::new("Contains", vec![Type::Str], Type::Bool));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_matching_is_case_insensitive() {
        let name = MemberName::new("Length").with_alias("len");
        assert!(name.matches("Length"));
        assert!(name.matches("LEN"));
        assert!(!name.matches("length"));
    }

    #[test]
    fn test_find_members_respects_kind_mask() {
        let mut registry = TypeRegistry::new();
        let point = registry.declare("Point");
        registry
            .type_def_mut(&point)
            .unwrap()
            .add_field("X", Type::Int)
            .add_method(MethodDef::new("X", vec![], Type::Int));

        assert_eq!(registry.find_members(&point, "X", MemberKinds::ALL).len(), 2);
        assert!(matches!(
            registry.find_members(&point, "X", MemberKinds::FIELD)[..],
            [MemberHandle::Field(_)]
        ));
        assert_eq!(registry.find_methods(&point, "X").len(), 1);
    }

    #[test]
    fn test_member_index_is_rebuilt_after_mutation() {
        let mut registry = TypeRegistry::new();
        let point = registry.declare("Point");
        assert!(registry.find_members(&point, "Y", MemberKinds::ALL).is_empty());
        registry.type_def_mut(&point).unwrap().add_field("Y", Type::Int);
        assert_eq!(registry.find_members(&point, "Y", MemberKinds::ALL).len(), 1);
    }

    #[test]
    fn test_primitive_widening_is_one_directional() {
        let registry = TypeRegistry::new();
        assert!(registry.implicit_conversion(&Type::Int, &Type::Double).is_some());
        assert!(registry.implicit_conversion(&Type::Char, &Type::Int).is_some());
        assert!(registry.implicit_conversion(&Type::Double, &Type::Int).is_none());
        assert!(registry.implicit_conversion(&Type::Int, &Type::Str).is_none());
    }
}
