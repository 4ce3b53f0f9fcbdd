//! Error types for the bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError            - every failure visible to host code
//! ├── ForeignFault       - an exception raised inside the foreign runtime
//! RegistrationError      - mistakes while describing types to a runtime
//! ```
//!
//! Every [`BridgeError`] maps to one host-native signal through
//! [`BridgeError::host_kind`]; the host boundary raises that signal with the
//! error's display text as its message.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Foreign Faults
// ============================================================================

/// An exception raised inside the foreign runtime during a call.
///
/// `detail` is the runtime's full diagnostic text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ForeignFault {
    /// Qualified name of the foreign exception type.
    pub type_name: String,
    /// Short message.
    pub message: String,
    /// Full diagnostic text as produced by the runtime.
    pub detail: String,
}

impl ForeignFault {
    /// Build a fault whose diagnostic text is `"<type_name>: <message>"`.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let message = message.into();
        let detail = format!("{type_name}: {message}");
        Self {
            type_name,
            message,
            detail,
        }
    }

    /// Build a fault with explicit diagnostic text.
    pub fn with_detail(
        type_name: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn null_reference(what: impl fmt::Display) -> Self {
        Self::new(
            "System.NullReferenceException",
            format!("Object reference not set to an instance of an object ({what})"),
        )
    }

    pub fn invalid_cast(message: impl Into<String>) -> Self {
        Self::new("System.InvalidCastException", message)
    }

    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        Self::new(
            "System.IndexOutOfRangeException",
            format!("Index {index} was outside the bounds of the array (length {len})"),
        )
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new("System.ArgumentException", message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new("System.NotSupportedException", message)
    }
}

// ============================================================================
// Bridge Errors
// ============================================================================

/// Failures raised by the bridge.
///
/// Argument-count and overload failures are always produced before any
/// foreign call executes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Unknown member, type or namespace entry.
    #[error("{0}")]
    NotFound(String),

    /// A host value cannot satisfy the declared foreign type.
    #[error("Cannot convert {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("Incorrect number of parameters: expected {expected}, got {actual}")]
    InvalidArgumentCount { expected: usize, actual: usize },

    #[error("No suitable overload for {name}({args})")]
    NoSuitableOverload { name: String, args: String },

    #[error("No such overload of {name}")]
    NoSuchOverload { name: String },

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: i64, len: usize },

    /// Dereferencing an absent or stale foreign handle.
    #[error("Null reference: {0}")]
    NullReference(String),

    /// End of iteration. Not a failure.
    #[error("No more data")]
    StopIteration,

    #[error(transparent)]
    ForeignFault(#[from] ForeignFault),

    /// A name being imported already exists in the target scope.
    #[error("{0} already defined")]
    AlreadyDefined(String),

    /// The operation does not apply to this handle.
    #[error("{0}")]
    InvalidOperation(String),

    /// A host callable raised.
    #[error("{0}")]
    Host(String),
}

/// Host-native signal a [`BridgeError`] is raised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostErrorKind {
    AttributeError,
    TypeError,
    IndexError,
    ReferenceError,
    StopIteration,
    Exception,
}

impl HostErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            HostErrorKind::AttributeError => "AttributeError",
            HostErrorKind::TypeError => "TypeError",
            HostErrorKind::IndexError => "IndexError",
            HostErrorKind::ReferenceError => "ReferenceError",
            HostErrorKind::StopIteration => "StopIteration",
            HostErrorKind::Exception => "Exception",
        }
    }
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        BridgeError::NotFound(what.into())
    }

    pub fn invalid_cast(from: impl Into<String>, to: impl Into<String>) -> Self {
        BridgeError::InvalidCast {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        BridgeError::InvalidOperation(message.into())
    }

    /// The host-native signal this error is raised as.
    pub fn host_kind(&self) -> HostErrorKind {
        match self {
            BridgeError::NotFound(_) => HostErrorKind::AttributeError,
            BridgeError::InvalidCast { .. }
            | BridgeError::InvalidArgumentCount { .. }
            | BridgeError::NoSuitableOverload { .. }
            | BridgeError::NoSuchOverload { .. } => HostErrorKind::TypeError,
            BridgeError::IndexOutOfRange { .. } => HostErrorKind::IndexError,
            BridgeError::NullReference(_) => HostErrorKind::ReferenceError,
            BridgeError::StopIteration => HostErrorKind::StopIteration,
            BridgeError::ForeignFault(_)
            | BridgeError::AlreadyDefined(_)
            | BridgeError::InvalidOperation(_)
            | BridgeError::Host(_) => HostErrorKind::Exception,
        }
    }

    pub fn is_stop_iteration(&self) -> bool {
        matches!(self, BridgeError::StopIteration)
    }
}

/// Convenience alias used throughout the bridge crates.
pub type BridgeResult<T> = Result<T, BridgeError>;

// ============================================================================
// Registration Errors
// ============================================================================

/// Mistakes made while describing types to a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("type '{0}' is already registered")]
    DuplicateType(String),

    #[error("module '{0}' is already loaded")]
    DuplicateModule(String),

    #[error("type '{0}' is not registered")]
    UnknownType(String),

    #[error("invalid type definition for '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
}
