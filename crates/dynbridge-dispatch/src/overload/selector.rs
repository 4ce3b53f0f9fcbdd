//! Explicit overload selection from a host-side index expression.

use dynbridge_core::{BridgeError, BridgeResult, HostValue, TypeHash};

/// How the host picked an overload by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadSelector {
    /// Position in the overload list.
    Index(i128),
    /// Exact parameter types, or type arguments for a generic definition.
    Witnesses(Vec<TypeHash>),
}

impl OverloadSelector {
    /// Interpret a host index value.
    ///
    /// `None` names the parameterless signature, an int is a position, a list
    /// names several types and anything else names one.
    pub fn from_host(value: &HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::None => Ok(OverloadSelector::Witnesses(Vec::new())),
            HostValue::Int(index) => Ok(OverloadSelector::Index(*index)),
            HostValue::List(items) => items
                .iter()
                .map(witness)
                .collect::<BridgeResult<Vec<_>>>()
                .map(OverloadSelector::Witnesses),
            single => witness(single).map(|ty| OverloadSelector::Witnesses(vec![ty])),
        }
    }

    pub fn witnesses(types: impl IntoIterator<Item = TypeHash>) -> Self {
        OverloadSelector::Witnesses(types.into_iter().collect())
    }
}

/// Type named by a witness value.
fn witness(value: &HostValue) -> BridgeResult<TypeHash> {
    match value {
        HostValue::Type(ty) => Ok(ty.type_hash()),
        HostValue::Object(handle) if handle.has_type() => Ok(handle
            .value()
            .runtime_type()
            .unwrap_or(handle.type_hash())),
        other => Err(BridgeError::invalid_cast(other.type_name(), "Type")),
    }
}
