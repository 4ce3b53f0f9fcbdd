//! Resolved members: what a name on a handle turned out to be.

use crate::{CallableDescriptor, FieldInfo, ForeignValue, MemberKind, PropertyInfo, TypeHash};

/// A callable together with the receiver it will be invoked on.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCallable {
    pub callable: CallableDescriptor,
    /// `None` for static methods and constructors.
    pub receiver: Option<ForeignValue>,
}

impl BoundCallable {
    pub fn new(callable: CallableDescriptor, receiver: Option<ForeignValue>) -> Self {
        let receiver = if callable.is_static { None } else { receiver };
        Self { callable, receiver }
    }

    pub fn unbound(callable: CallableDescriptor) -> Self {
        Self {
            callable,
            receiver: None,
        }
    }
}

/// Callables sharing a name and declaring type.
///
/// Append-only; insertion order is the order overload resolution tries
/// candidates in.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadSet {
    name: String,
    declaring_type: TypeHash,
    receiver: Option<ForeignValue>,
    candidates: Vec<CallableDescriptor>,
}

impl OverloadSet {
    pub fn new(
        name: impl Into<String>,
        declaring_type: TypeHash,
        receiver: Option<ForeignValue>,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            receiver,
            candidates: Vec::new(),
        }
    }

    /// Build a set of constructors for `declaring_type`.
    pub fn constructors(declaring_type: TypeHash, ctors: Vec<CallableDescriptor>) -> Self {
        Self {
            name: ".ctor".to_string(),
            declaring_type,
            receiver: None,
            candidates: ctors,
        }
    }

    pub fn push(&mut self, callable: CallableDescriptor) {
        self.candidates.push(callable);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> TypeHash {
        self.declaring_type
    }

    pub fn receiver(&self) -> Option<&ForeignValue> {
        self.receiver.as_ref()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CallableDescriptor> {
        self.candidates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallableDescriptor> {
        self.candidates.iter()
    }

    /// Candidate `index` bound to the set's receiver.
    pub fn bind(&self, index: usize) -> Option<BoundCallable> {
        self.candidates
            .get(index)
            .map(|callable| BoundCallable::new(callable.clone(), self.receiver.clone()))
    }
}

/// Result of resolving a member name on a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberBinding {
    Property {
        info: PropertyInfo,
        receiver: Option<ForeignValue>,
    },
    Field {
        info: FieldInfo,
        receiver: Option<ForeignValue>,
    },
    Method(BoundCallable),
    Overloads(OverloadSet),
    NestedType(TypeHash),
    /// Several members of different categories share the name.
    Mixed(Vec<MemberBinding>),
}

impl MemberBinding {
    /// Methods and nested types cannot change between reads and may be cached.
    pub fn is_constant(&self) -> bool {
        match self {
            MemberBinding::Method(_) | MemberBinding::Overloads(_) | MemberBinding::NestedType(_) => {
                true
            }
            MemberBinding::Property { .. } | MemberBinding::Field { .. } => false,
            MemberBinding::Mixed(all) => all.iter().all(MemberBinding::is_constant),
        }
    }

    /// Category of the binding; `None` for a mixed set.
    pub fn kind(&self) -> Option<MemberKind> {
        match self {
            MemberBinding::Property { .. } => Some(MemberKind::Property),
            MemberBinding::Field { .. } => Some(MemberKind::Field),
            MemberBinding::Method(_) | MemberBinding::Overloads(_) => Some(MemberKind::Method),
            MemberBinding::NestedType(_) => Some(MemberKind::NestedType),
            MemberBinding::Mixed(_) => None,
        }
    }

    /// Declared type: property/field type, method return type or the nested type.
    pub fn declared_type(&self) -> Option<TypeHash> {
        match self {
            MemberBinding::Property { info, .. } => Some(info.property_type),
            MemberBinding::Field { info, .. } => Some(info.field_type),
            MemberBinding::Method(bound) => Some(bound.callable.return_type),
            MemberBinding::NestedType(ty) => Some(*ty),
            MemberBinding::Overloads(_) | MemberBinding::Mixed(_) => None,
        }
    }

    /// Whether a value can be assigned through this binding.
    pub fn is_writable(&self) -> bool {
        match self {
            MemberBinding::Property { info, .. } => info.setter.is_some(),
            MemberBinding::Field { info, .. } => !info.is_readonly,
            _ => false,
        }
    }
}
