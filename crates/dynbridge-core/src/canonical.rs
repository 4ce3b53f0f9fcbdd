//! Canonical foreign types that key the conversion rules.

use std::fmt;

use crate::{TypeHash, well_known};

/// The fixed categories a foreign type is dispatched on during conversion.
///
/// Every type that is not one of the primitive categories or `String` is
/// `Object` and goes through the opaque handle rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Bool,
    Float32,
    Float64,
    String,
    Object,
}

impl CanonicalType {
    /// All non-object categories, in dispatch order.
    pub const PRIMITIVES: [CanonicalType; 12] = [
        CanonicalType::UInt8,
        CanonicalType::UInt16,
        CanonicalType::UInt32,
        CanonicalType::UInt64,
        CanonicalType::Int8,
        CanonicalType::Int16,
        CanonicalType::Int32,
        CanonicalType::Int64,
        CanonicalType::Bool,
        CanonicalType::Float64,
        CanonicalType::Float32,
        CanonicalType::String,
    ];

    /// Classify a foreign type by identity.
    pub fn of(ty: TypeHash) -> Self {
        Self::PRIMITIVES
            .into_iter()
            .find(|canonical| canonical.type_hash() == ty)
            .unwrap_or(CanonicalType::Object)
    }

    pub const fn type_hash(self) -> TypeHash {
        match self {
            CanonicalType::Int8 => well_known::SBYTE,
            CanonicalType::Int16 => well_known::INT16,
            CanonicalType::Int32 => well_known::INT32,
            CanonicalType::Int64 => well_known::INT64,
            CanonicalType::UInt8 => well_known::BYTE,
            CanonicalType::UInt16 => well_known::UINT16,
            CanonicalType::UInt32 => well_known::UINT32,
            CanonicalType::UInt64 => well_known::UINT64,
            CanonicalType::Bool => well_known::BOOLEAN,
            CanonicalType::Float32 => well_known::SINGLE,
            CanonicalType::Float64 => well_known::DOUBLE,
            CanonicalType::String => well_known::STRING,
            CanonicalType::Object => well_known::OBJECT,
        }
    }

    /// Qualified foreign name of the category's type.
    pub const fn qualified_name(self) -> &'static str {
        match self {
            CanonicalType::Int8 => "System.SByte",
            CanonicalType::Int16 => "System.Int16",
            CanonicalType::Int32 => "System.Int32",
            CanonicalType::Int64 => "System.Int64",
            CanonicalType::UInt8 => "System.Byte",
            CanonicalType::UInt16 => "System.UInt16",
            CanonicalType::UInt32 => "System.UInt32",
            CanonicalType::UInt64 => "System.UInt64",
            CanonicalType::Bool => "System.Boolean",
            CanonicalType::Float32 => "System.Single",
            CanonicalType::Float64 => "System.Double",
            CanonicalType::String => "System.String",
            CanonicalType::Object => "System.Object",
        }
    }

    /// Inclusive integer range, for the integral categories.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            CanonicalType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            CanonicalType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            CanonicalType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            CanonicalType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            CanonicalType::UInt8 => Some((0, u8::MAX as i128)),
            CanonicalType::UInt16 => Some((0, u16::MAX as i128)),
            CanonicalType::UInt32 => Some((0, u32::MAX as i128)),
            CanonicalType::UInt64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        self.integer_range().is_some()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, CanonicalType::Float32 | CanonicalType::Float64)
    }

    /// Numeric and boolean categories; `String` and `Object` are not primitive.
    pub const fn is_primitive(self) -> bool {
        !matches!(self, CanonicalType::String | CanonicalType::Object)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
