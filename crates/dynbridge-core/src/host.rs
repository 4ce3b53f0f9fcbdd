//! Values as the dynamically typed host sees them.

use std::fmt;
use std::sync::Arc;

use crate::{BoundCallable, BridgeResult, ForeignHandle, OverloadSet, TypeHandle};

type HostFn = dyn Fn(&[HostValue]) -> BridgeResult<HostValue> + Send + Sync;

/// A host-language callable.
///
/// `arity` is the number of positional arguments the callable declares, when
/// the host knows it; delegate wrapping checks it against the delegate's
/// signature.
#[derive(Clone)]
pub struct HostCallable {
    name: Arc<str>,
    arity: Option<usize>,
    func: Arc<HostFn>,
}

impl HostCallable {
    /// Callable accepting any number of arguments.
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[HostValue]) -> BridgeResult<HostValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            arity: None,
            func: Arc::new(func),
        }
    }

    /// Callable declaring exactly `arity` positional arguments.
    pub fn with_arity<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&[HostValue]) -> BridgeResult<HostValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            arity: Some(arity),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn call(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &HostCallable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for HostCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCallable")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A host value.
///
/// Integers are wide enough for every foreign integer width. Dictionaries
/// keep insertion order.
#[derive(Clone, Debug, Default)]
pub enum HostValue {
    #[default]
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    List(Vec<HostValue>),
    Dict(Vec<(HostValue, HostValue)>),
    /// A foreign object.
    Object(ForeignHandle),
    /// A foreign type.
    Type(TypeHandle),
    /// A single foreign method bound to its receiver.
    Method(BoundCallable),
    /// Foreign overloads sharing a name.
    Overloads(OverloadSet),
    /// A host function.
    Callable(HostCallable),
}

impl HostValue {
    pub fn str(s: impl Into<String>) -> Self {
        HostValue::Str(s.into())
    }

    /// Host-side category name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::None => "NoneType",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "str",
            HostValue::List(_) => "list",
            HostValue::Dict(_) => "dict",
            HostValue::Object(_) => "ForeignHandle",
            HostValue::Type(_) => "ForeignType",
            HostValue::Method(_) => "ForeignMethod",
            HostValue::Overloads(_) => "ForeignOverloads",
            HostValue::Callable(_) => "function",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HostValue::None)
    }

    /// Whether the value can be called from host code.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            HostValue::Callable(_) | HostValue::Method(_) | HostValue::Overloads(_) | HostValue::Type(_)
        )
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            HostValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&ForeignHandle> {
        match self {
            HostValue::Object(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::None, HostValue::None) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::List(a), HostValue::List(b)) => a == b,
            (HostValue::Dict(a), HostValue::Dict(b)) => a == b,
            // Identity of the foreign reference, not foreign equality
            (HostValue::Object(a), HostValue::Object(b)) => {
                a.ptr_eq(b) || (a.value() == b.value() && a.type_hash() == b.type_hash())
            }
            (HostValue::Type(a), HostValue::Type(b)) => a == b,
            (HostValue::Method(a), HostValue::Method(b)) => a == b,
            (HostValue::Overloads(a), HostValue::Overloads(b)) => a == b,
            (HostValue::Callable(a), HostValue::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value as i128)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value as i128)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<ForeignHandle> for HostValue {
    fn from(value: ForeignHandle) -> Self {
        HostValue::Object(value)
    }
}

impl From<HostCallable> for HostValue {
    fn from(value: HostCallable) -> Self {
        HostValue::Callable(value)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callables_are_invocable_and_shared() {
        let add = HostCallable::with_arity("add", 2, |args| match args {
            [HostValue::Int(a), HostValue::Int(b)] => Ok(HostValue::Int(a + b)),
            _ => Err(crate::BridgeError::Host("bad args".into())),
        });
        assert_eq!(add.arity(), Some(2));
        assert_eq!(add.call(&[1.into(), 2.into()]), Ok(HostValue::Int(3)));
        let value = HostValue::from(add.clone());
        assert!(value.is_callable());
        assert_eq!(value, HostValue::Callable(add));
    }

    #[test]
    fn structural_equality() {
        let a: HostValue = vec![1, 2, 3].into();
        let b = HostValue::List(vec![1.into(), 2.into(), 3.into()]);
        assert_eq!(a, b);
        assert_ne!(HostValue::Int(1), HostValue::Float(1.0));
    }

    #[test]
    fn type_names() {
        assert_eq!(HostValue::None.type_name(), "NoneType");
        assert_eq!(HostValue::from("x").type_name(), "str");
        assert!(!HostValue::Int(1).is_callable());
    }
}
