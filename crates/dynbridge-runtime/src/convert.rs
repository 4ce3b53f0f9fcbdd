//! Typed extraction of native-call arguments and return values.
//!
//! - [`FromForeign`]: read a Rust value out of a [`ForeignValue`]
//! - [`IntoForeign`]: wrap a Rust value as a [`ForeignValue`]
//!
//! Integer extraction accepts any integral variant whose value fits the
//! target width; anything else is an invalid-cast fault.

use dynbridge_core::{ForeignFault, ForeignValue, ObjectRef};

pub trait FromForeign: Sized {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault>;
}

pub trait IntoForeign {
    fn into_foreign(self) -> ForeignValue;
}

fn kind_of(value: &ForeignValue) -> &'static str {
    match value {
        ForeignValue::Null => "null",
        ForeignValue::Bool(_) => "bool",
        ForeignValue::String(_) => "string",
        ForeignValue::Float32(_) | ForeignValue::Float64(_) => "float",
        ForeignValue::Enum { .. } => "enum",
        ForeignValue::Object(_) => "object",
        _ => "integer",
    }
}

macro_rules! impl_foreign_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromForeign for $ty {
                fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
                    let wide = value.as_integer().ok_or_else(|| {
                        ForeignFault::invalid_cast(format!(
                            "expected {}, got {}",
                            stringify!($ty),
                            kind_of(value)
                        ))
                    })?;
                    <$ty>::try_from(wide).map_err(|_| {
                        ForeignFault::new(
                            "System.OverflowException",
                            format!("{} does not fit in {}", wide, stringify!($ty)),
                        )
                    })
                }
            }

            impl IntoForeign for $ty {
                fn into_foreign(self) -> ForeignValue {
                    ForeignValue::$variant(self)
                }
            }
        )*
    };
}

impl_foreign_int!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

impl FromForeign for f64 {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        match value {
            ForeignValue::Float32(v) => Ok(*v as f64),
            ForeignValue::Float64(v) => Ok(*v),
            other => other.as_integer().map(|v| v as f64).ok_or_else(|| {
                ForeignFault::invalid_cast(format!("expected double, got {}", kind_of(other)))
            }),
        }
    }
}

impl IntoForeign for f64 {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::Float64(self)
    }
}

impl FromForeign for f32 {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        f64::from_foreign(value).map(|v| v as f32)
    }
}

impl IntoForeign for f32 {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::Float32(self)
    }
}

impl FromForeign for bool {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        value.as_bool().ok_or_else(|| {
            ForeignFault::invalid_cast(format!("expected bool, got {}", kind_of(value)))
        })
    }
}

impl IntoForeign for bool {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::Bool(self)
    }
}

impl FromForeign for String {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        value.as_str().map(str::to_string).ok_or_else(|| {
            ForeignFault::invalid_cast(format!("expected string, got {}", kind_of(value)))
        })
    }
}

impl IntoForeign for String {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::from(self)
    }
}

impl IntoForeign for &str {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::string(self)
    }
}

impl FromForeign for ObjectRef {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        match value {
            ForeignValue::Object(obj) => Ok(*obj),
            ForeignValue::Null => Err(ForeignFault::null_reference("argument")),
            other => Err(ForeignFault::invalid_cast(format!(
                "expected object, got {}",
                kind_of(other)
            ))),
        }
    }
}

impl FromForeign for ForeignValue {
    fn from_foreign(value: &ForeignValue) -> Result<Self, ForeignFault> {
        Ok(value.clone())
    }
}

impl IntoForeign for ForeignValue {
    fn into_foreign(self) -> ForeignValue {
        self
    }
}

impl IntoForeign for () {
    fn into_foreign(self) -> ForeignValue {
        ForeignValue::Null
    }
}
