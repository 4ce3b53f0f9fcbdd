//! Value conversion between the host and the foreign runtime.
//!
//! Conversion dispatches on the canonical identity of the foreign type: the
//! primitive categories convert directly, everything else goes through the
//! opaque object rule, which wraps foreign objects in [`ForeignHandle`]s.
//!
//! ## Host to foreign
//!
//! Rules are tried in this order; the first that applies decides:
//!
//! 1. `None` becomes the foreign null value
//! 2. A handle whose runtime type is assignable to the target passes through
//! 3. Primitive and string targets use the canonical rule
//! 4. `System.Object` targets box host ints, floats, strings and booleans
//! 5. Delegate targets wrap host callables (see [`CallbackMarshaller`](crate::CallbackMarshaller))
//! 6. Host lists fill arrays and single-argument generic collections
//! 7. Host dicts fill two-argument generic collections
//!
//! Anything else fails with `InvalidCast`.

mod primitive;
mod structural;

pub use primitive::{host_integer, primitive_to_foreign, primitive_to_host};

use dynbridge_core::{
    BridgeError, BridgeResult, CanonicalType, ForeignHandle, ForeignValue, HostValue, TypeHash,
    well_known,
};

use crate::BridgeContext;

/// How values of a foreign type convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionRule {
    /// Direct numeric, boolean or string conversion.
    Primitive(CanonicalType),
    /// Wrapped in a handle on the way out, unwrapped or built structurally on
    /// the way in.
    Opaque,
}

impl ConversionRule {
    pub fn for_type(ty: TypeHash) -> Self {
        match CanonicalType::of(ty) {
            CanonicalType::Object => ConversionRule::Opaque,
            canonical => ConversionRule::Primitive(canonical),
        }
    }
}

/// Bidirectional converter bound to a context.
#[derive(Clone, Copy)]
pub struct ConversionEngine<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> ConversionEngine<'a> {
    pub fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &'a BridgeContext {
        self.ctx
    }

    /// Host view of a foreign value.
    pub fn to_host(&self, value: &ForeignValue) -> HostValue {
        if value.is_null() {
            return HostValue::None;
        }
        primitive_to_host(value)
            .unwrap_or_else(|| HostValue::Object(ForeignHandle::from_value(value.clone())))
    }

    pub fn to_host_all(&self, values: &[ForeignValue]) -> Vec<HostValue> {
        values.iter().map(|value| self.to_host(value)).collect()
    }

    /// Foreign value satisfying `declared` for a host value.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn to_foreign(&self, value: &HostValue, declared: TypeHash) -> BridgeResult<ForeignValue> {
        tracing::trace!(host = value.type_name(), target = %declared, "convert to foreign");

        if value.is_none() {
            return Ok(ForeignValue::Null);
        }

        if let HostValue::Object(handle) = value {
            if handle.is_null() {
                return Ok(ForeignValue::Null);
            }
            let source = handle.value().runtime_type().unwrap_or(handle.type_hash());
            if self.ctx.is_assignable(declared, source) {
                return Ok(handle.value().clone());
            }
        }

        if let ConversionRule::Primitive(canonical) = ConversionRule::for_type(declared) {
            return primitive_to_foreign(canonical, value)
                .ok_or_else(|| self.cast_error(value, declared));
        }

        if declared == well_known::OBJECT {
            return box_primitive(value).ok_or_else(|| self.cast_error(value, declared));
        }

        let target = self.ctx.type_info(declared)?;
        if target.is_delegate() {
            if value.is_callable() {
                return self.ctx.callbacks().wrap(value, declared);
            }
            return Err(self.cast_error(value, declared));
        }

        let converted = match value {
            HostValue::List(items) => structural::sequence_to_foreign(self, items, &target)?,
            HostValue::Dict(pairs) => structural::mapping_to_foreign(self, pairs, &target)?,
            _ => None,
        };
        converted.ok_or_else(|| self.cast_error(value, declared))
    }

    /// Convert each argument against its declared type, all or nothing.
    pub fn to_foreign_all(
        &self,
        values: &[HostValue],
        declared: &[TypeHash],
    ) -> BridgeResult<Vec<ForeignValue>> {
        values
            .iter()
            .zip(declared)
            .map(|(value, ty)| self.to_foreign(value, *ty))
            .collect()
    }

    pub(crate) fn cast_error(&self, value: &HostValue, declared: TypeHash) -> BridgeError {
        BridgeError::invalid_cast(value.type_name(), self.ctx.type_name(declared))
    }
}

/// Boxed form of a host scalar stored in a `System.Object` location.
fn box_primitive(value: &HostValue) -> Option<ForeignValue> {
    match value {
        HostValue::Bool(b) => Some(ForeignValue::Bool(*b)),
        HostValue::Int(v) => i32::try_from(*v)
            .map(ForeignValue::Int32)
            .or_else(|_| i64::try_from(*v).map(ForeignValue::Int64))
            .ok(),
        HostValue::Float(v) => Some(ForeignValue::Float64(*v)),
        HostValue::Str(s) => Some(ForeignValue::string(s)),
        _ => None,
    }
}
