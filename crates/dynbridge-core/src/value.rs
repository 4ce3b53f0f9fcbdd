//! Values as they exist on the foreign side of the bridge.

use std::sync::Arc;

use crate::{CanonicalType, TypeHash};

/// Reference to one object on a foreign runtime's heap.
///
/// The index/generation pair lets the runtime detect references to objects
/// it has since released. The runtime type travels with the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub index: u32,
    pub generation: u32,
    pub type_hash: TypeHash,
}

impl ObjectRef {
    pub fn new(index: u32, generation: u32, type_hash: TypeHash) -> Self {
        Self {
            index,
            generation,
            type_hash,
        }
    }
}

/// A foreign runtime value.
///
/// Primitives and strings travel inline; enum values carry their type;
/// everything else is a heap object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ForeignValue {
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(Arc<str>),
    Enum { ty: TypeHash, value: i64 },
    Object(ObjectRef),
}

impl ForeignValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        ForeignValue::String(Arc::from(s.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ForeignValue::Null)
    }

    /// The runtime type of the value, `None` for null.
    pub fn runtime_type(&self) -> Option<TypeHash> {
        let canonical = match self {
            ForeignValue::Null => return None,
            ForeignValue::Enum { ty, .. } => return Some(*ty),
            ForeignValue::Object(obj) => return Some(obj.type_hash),
            ForeignValue::Bool(_) => CanonicalType::Bool,
            ForeignValue::Int8(_) => CanonicalType::Int8,
            ForeignValue::Int16(_) => CanonicalType::Int16,
            ForeignValue::Int32(_) => CanonicalType::Int32,
            ForeignValue::Int64(_) => CanonicalType::Int64,
            ForeignValue::UInt8(_) => CanonicalType::UInt8,
            ForeignValue::UInt16(_) => CanonicalType::UInt16,
            ForeignValue::UInt32(_) => CanonicalType::UInt32,
            ForeignValue::UInt64(_) => CanonicalType::UInt64,
            ForeignValue::Float32(_) => CanonicalType::Float32,
            ForeignValue::Float64(_) => CanonicalType::Float64,
            ForeignValue::String(_) => CanonicalType::String,
        };
        Some(canonical.type_hash())
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            ForeignValue::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ForeignValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral value of an integer or enum, widened.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            ForeignValue::Int8(v) => *v as i128,
            ForeignValue::Int16(v) => *v as i128,
            ForeignValue::Int32(v) => *v as i128,
            ForeignValue::Int64(v) => *v as i128,
            ForeignValue::UInt8(v) => *v as i128,
            ForeignValue::UInt16(v) => *v as i128,
            ForeignValue::UInt32(v) => *v as i128,
            ForeignValue::UInt64(v) => *v as i128,
            ForeignValue::Enum { value, .. } => *value as i128,
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ForeignValue::Float32(v) => Some(*v as f64),
            ForeignValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ForeignValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for ForeignValue {
    fn from(value: bool) -> Self {
        ForeignValue::Bool(value)
    }
}

impl From<i32> for ForeignValue {
    fn from(value: i32) -> Self {
        ForeignValue::Int32(value)
    }
}

impl From<i64> for ForeignValue {
    fn from(value: i64) -> Self {
        ForeignValue::Int64(value)
    }
}

impl From<f64> for ForeignValue {
    fn from(value: f64) -> Self {
        ForeignValue::Float64(value)
    }
}

impl From<&str> for ForeignValue {
    fn from(value: &str) -> Self {
        ForeignValue::string(value)
    }
}

impl From<String> for ForeignValue {
    fn from(value: String) -> Self {
        ForeignValue::String(Arc::from(value))
    }
}
