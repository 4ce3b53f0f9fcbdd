//! Reflected metadata: types, callables and members.
//!
//! Descriptors are plain data handed out by a [`ForeignRuntime`](crate::ForeignRuntime).
//! Types reference each other by [`TypeHash`] and are resolved through the
//! runtime, so cyclic type graphs (a method returning its own type) need no
//! special handling.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bitflags::bitflags;

use crate::{ForeignValue, QualifiedName, TypeHash, well_known};

bitflags! {
    /// Classification of a foreign type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        const CLASS = 1 << 0;
        const VALUE_TYPE = 1 << 1;
        const INTERFACE = 1 << 2;
        const ENUM = 1 << 3;
        const DELEGATE = 1 << 4;
        const ARRAY = 1 << 5;
        /// Open generic definition; must be specialized before use.
        const GENERIC_DEFINITION = 1 << 6;
        /// Stand-in for a generic parameter (`T`) inside signatures.
        const GENERIC_PARAMETER = 1 << 7;
        /// Emitted by a compiler, never imported into host scopes.
        const COMPILER_GENERATED = 1 << 8;
        const ABSTRACT = 1 << 9;
        /// Built-in numeric or boolean type.
        const PRIMITIVE = 1 << 10;
    }
}

bitflags! {
    /// Passing mode of a parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamFlags: u8 {
        const IN = 1 << 0;
        const OUT = 1 << 1;
        const OPTIONAL = 1 << 2;
        /// Passed by reference; `param_type` is the referenced element type.
        const BY_REF = 1 << 3;
    }
}

// ============================================================================
// Types
// ============================================================================

/// Reflected description of one foreign type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub qname: QualifiedName,
    pub type_hash: TypeHash,
    pub flags: TypeFlags,
    pub base_type: Option<TypeHash>,
    pub interfaces: Vec<TypeHash>,
    /// Generic parameter stand-ins of a definition, in order.
    pub generic_params: Vec<TypeHash>,
    /// Arguments of a constructed generic type.
    pub generic_args: Vec<TypeHash>,
    /// Definition a constructed generic type was built from.
    pub generic_definition: Option<TypeHash>,
    /// Element type of an array.
    pub element_type: Option<TypeHash>,
    pub constructors: Vec<CallableDescriptor>,
    /// Declared public members, static and instance.
    pub members: Vec<MemberInfo>,
    /// Named values of an enum type.
    pub enum_values: Vec<(String, i64)>,
    /// `Invoke` signature of a delegate type.
    pub delegate_invoke: Option<CallableDescriptor>,
}

impl TypeInfo {
    pub fn new(qname: impl Into<QualifiedName>, flags: TypeFlags) -> Self {
        let qname = qname.into();
        let type_hash = qname.to_type_hash();
        Self {
            qname,
            type_hash,
            flags,
            base_type: None,
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            generic_definition: None,
            element_type: None,
            constructors: Vec::new(),
            members: Vec::new(),
            enum_values: Vec::new(),
            delegate_invoke: None,
        }
    }

    /// Dotted qualified name.
    pub fn name(&self) -> String {
        self.qname.to_string()
    }

    pub fn simple_name(&self) -> &str {
        self.qname.simple_name()
    }

    pub fn is_value_type(&self) -> bool {
        self.flags
            .intersects(TypeFlags::VALUE_TYPE | TypeFlags::ENUM | TypeFlags::PRIMITIVE)
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    pub fn is_enum(&self) -> bool {
        self.flags.contains(TypeFlags::ENUM)
    }

    pub fn is_delegate(&self) -> bool {
        self.flags.contains(TypeFlags::DELEGATE)
    }

    pub fn is_array(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAY)
    }

    pub fn is_primitive(&self) -> bool {
        self.flags.contains(TypeFlags::PRIMITIVE)
    }

    pub fn is_generic_definition(&self) -> bool {
        self.flags.contains(TypeFlags::GENERIC_DEFINITION)
    }

    pub fn is_generic_parameter(&self) -> bool {
        self.flags.contains(TypeFlags::GENERIC_PARAMETER)
    }

    /// Constructed from a generic definition.
    pub fn is_constructed_generic(&self) -> bool {
        self.generic_definition.is_some()
    }

    pub fn is_compiler_generated(&self) -> bool {
        self.flags.contains(TypeFlags::COMPILER_GENERATED) || self.qname.name.starts_with('<')
    }

    pub fn is_string(&self) -> bool {
        self.type_hash == well_known::STRING
    }

    /// Number of generic parameters (definitions) or arguments (constructed).
    pub fn generic_arity(&self) -> usize {
        self.generic_params.len().max(self.generic_args.len())
    }

    /// Declared members with this exact name.
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MemberInfo> {
        self.members.iter().filter(move |m| m.name() == name)
    }

    /// Name of an enum value, if declared.
    pub fn enum_name_of(&self, value: i64) -> Option<&str> {
        self.enum_values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    pub fn into_descriptor(self) -> TypeDescriptor {
        TypeDescriptor(Arc::new(self))
    }
}

/// Cheaply cloneable shared [`TypeInfo`].
#[derive(Clone)]
pub struct TypeDescriptor(Arc<TypeInfo>);

impl TypeDescriptor {
    pub fn new(info: TypeInfo) -> Self {
        Self(Arc::new(info))
    }

    pub fn ptr_eq(&self, other: &TypeDescriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for TypeDescriptor {
    type Target = TypeInfo;

    fn deref(&self) -> &TypeInfo {
        &self.0
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_hash == other.type_hash
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.qname.to_string())
            .field("flags", &self.flags)
            .finish()
    }
}

// ============================================================================
// Callables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Method,
    Constructor,
    /// Static method callable as an instance method of its first
    /// parameter's type.
    Extension,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub param_type: TypeHash,
    pub flags: ParamFlags,
    /// Declared default, used when an optional argument is omitted.
    pub default: Option<ForeignValue>,
}

impl ParamDescriptor {
    /// Plain input parameter.
    pub fn new(name: impl Into<String>, param_type: TypeHash) -> Self {
        Self {
            name: name.into(),
            param_type,
            flags: ParamFlags::IN,
            default: None,
        }
    }

    /// Output-only parameter.
    pub fn out(name: impl Into<String>, param_type: TypeHash) -> Self {
        Self {
            name: name.into(),
            param_type,
            flags: ParamFlags::OUT | ParamFlags::BY_REF,
            default: None,
        }
    }

    /// By-reference parameter read on the way in and reported on the way out.
    pub fn in_out(name: impl Into<String>, param_type: TypeHash) -> Self {
        Self {
            name: name.into(),
            param_type,
            flags: ParamFlags::IN | ParamFlags::OUT | ParamFlags::BY_REF,
            default: None,
        }
    }

    /// Optional input parameter with a declared default.
    pub fn optional(name: impl Into<String>, param_type: TypeHash, default: ForeignValue) -> Self {
        Self {
            name: name.into(),
            param_type,
            flags: ParamFlags::IN | ParamFlags::OPTIONAL,
            default: Some(default),
        }
    }

    pub fn is_out(&self) -> bool {
        self.flags.contains(ParamFlags::OUT)
    }

    /// Declared out and not in: skipped when binding arguments.
    pub fn is_out_only(&self) -> bool {
        self.flags.contains(ParamFlags::OUT) && !self.flags.contains(ParamFlags::IN)
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(ParamFlags::OPTIONAL)
    }

    pub fn is_by_ref(&self) -> bool {
        self.flags.contains(ParamFlags::BY_REF)
    }
}

/// A reflected method or constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableDescriptor {
    pub id: TypeHash,
    pub name: String,
    pub kind: CallableKind,
    pub declaring_type: TypeHash,
    pub return_type: TypeHash,
    pub is_static: bool,
    pub params: Vec<ParamDescriptor>,
    /// Generic parameter stand-ins of a generic method definition.
    pub generic_params: Vec<TypeHash>,
    /// Type arguments of an instantiated generic method.
    pub generic_args: Vec<TypeHash>,
    /// Id of the generic definition this method was instantiated from.
    pub definition: Option<TypeHash>,
}

impl CallableDescriptor {
    /// An instance method.
    pub fn method(
        declaring_type: TypeHash,
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
    ) -> Self {
        let name = name.into();
        let param_types: Vec<TypeHash> = params.iter().map(|p| p.param_type).collect();
        Self {
            id: TypeHash::from_method(declaring_type, &name, &param_types),
            name,
            kind: CallableKind::Method,
            declaring_type,
            return_type,
            is_static: false,
            params,
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            definition: None,
        }
    }

    /// A static method.
    pub fn static_method(
        declaring_type: TypeHash,
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
    ) -> Self {
        let mut method = Self::method(declaring_type, name, params, return_type);
        method.is_static = true;
        method
    }

    /// A static method extending the type of its first parameter.
    pub fn extension_method(
        declaring_type: TypeHash,
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
    ) -> Self {
        let mut method = Self::static_method(declaring_type, name, params, return_type);
        method.kind = CallableKind::Extension;
        method
    }

    /// A constructor; constructors never take a receiver.
    pub fn constructor(declaring_type: TypeHash, params: Vec<ParamDescriptor>) -> Self {
        let param_types: Vec<TypeHash> = params.iter().map(|p| p.param_type).collect();
        Self {
            id: TypeHash::from_constructor(declaring_type, &param_types),
            name: ".ctor".to_string(),
            kind: CallableKind::Constructor,
            declaring_type,
            return_type: declaring_type,
            is_static: true,
            params,
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            definition: None,
        }
    }

    /// Mark as a generic method definition over `params`.
    pub fn with_generic_params(mut self, params: Vec<TypeHash>) -> Self {
        self.generic_params = params;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == CallableKind::Constructor
    }

    pub fn is_extension(&self) -> bool {
        self.kind == CallableKind::Extension
    }

    /// Type the method extends, for extension methods with a first parameter.
    pub fn extended_type(&self) -> Option<TypeHash> {
        if !self.is_extension() {
            return None;
        }
        self.params.first().map(|param| param.param_type)
    }

    pub fn returns_void(&self) -> bool {
        self.return_type == well_known::VOID
    }

    /// A generic method that still needs type arguments.
    pub fn is_generic_definition(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_args.is_empty()
    }

    /// Parameters consumed from a positional argument list.
    pub fn input_count(&self) -> usize {
        self.params.iter().filter(|p| !p.is_out_only()).count()
    }

    pub fn has_outputs(&self) -> bool {
        self.params.iter().any(ParamDescriptor::is_out)
    }

    pub fn param_types(&self) -> Vec<TypeHash> {
        self.params.iter().map(|p| p.param_type).collect()
    }

    /// Same name and parameter types; used to hide overridden base methods.
    pub fn same_signature(&self, other: &CallableDescriptor) -> bool {
        self.name == other.name
            && self.is_static == other.is_static
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.param_type == b.param_type && a.flags == b.flags)
    }
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    pub property_type: TypeHash,
    pub is_static: bool,
    pub getter: Option<CallableDescriptor>,
    pub setter: Option<CallableDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub id: TypeHash,
    pub name: String,
    pub field_type: TypeHash,
    pub declaring_type: TypeHash,
    pub is_static: bool,
    pub is_readonly: bool,
}

impl FieldInfo {
    pub fn new(declaring_type: TypeHash, name: impl Into<String>, field_type: TypeHash) -> Self {
        let name = name.into();
        Self {
            id: TypeHash::from_member(declaring_type, &name),
            name,
            field_type,
            declaring_type,
            is_static: false,
            is_readonly: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedTypeInfo {
    pub name: String,
    pub nested_type: TypeHash,
}

/// Member categories a lookup can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Field,
    Method,
    NestedType,
}

/// A declared public member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberInfo {
    Property(PropertyInfo),
    Field(FieldInfo),
    Method(CallableDescriptor),
    NestedType(NestedTypeInfo),
}

impl MemberInfo {
    pub fn name(&self) -> &str {
        match self {
            MemberInfo::Property(p) => &p.name,
            MemberInfo::Field(f) => &f.name,
            MemberInfo::Method(m) => &m.name,
            MemberInfo::NestedType(n) => &n.name,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            MemberInfo::Property(_) => MemberKind::Property,
            MemberInfo::Field(_) => MemberKind::Field,
            MemberInfo::Method(_) => MemberKind::Method,
            MemberInfo::NestedType(_) => MemberKind::NestedType,
        }
    }

    /// Nested types are reachable from both instances and types.
    pub fn is_static(&self) -> bool {
        match self {
            MemberInfo::Property(p) => p.is_static,
            MemberInfo::Field(f) => f.is_static,
            MemberInfo::Method(m) => m.is_static,
            MemberInfo::NestedType(_) => true,
        }
    }

    /// Declared type of the member's value; methods report their return type.
    pub fn declared_type(&self) -> TypeHash {
        match self {
            MemberInfo::Property(p) => p.property_type,
            MemberInfo::Field(f) => f.field_type,
            MemberInfo::Method(m) => m.return_type,
            MemberInfo::NestedType(n) => n.nested_type,
        }
    }
}
