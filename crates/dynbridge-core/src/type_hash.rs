//! Deterministic hash-based identity for foreign types and callables.
//!
//! A [`TypeHash`] is computed from a qualified foreign type name (types) or from
//! the declaring type, member name and parameter types (callables). The same input
//! always produces the same hash, so a type can be referenced by hash before the
//! runtime has reported it and two runtimes naming the same type agree on identity.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so that a method and a
//! type sharing a name never collide. Type hashes are available in `const`
//! context through [`TypeHash::of_name`], which is how the well-known hashes in
//! [`well_known`] are defined.
//!
//! # Examples
//!
//! ```
//! use dynbridge_core::{TypeHash, well_known};
//!
//! let int_hash = TypeHash::from_name("System.Int32");
//! assert_eq!(int_hash, well_known::INT32);
//!
//! let a = TypeHash::from_method(well_known::STRING, "Concat", &[well_known::STRING]);
//! let b = TypeHash::from_method(well_known::STRING, "Concat", &[well_known::OBJECT]);
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::const_xxh64;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for combining components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for fields and properties.
    pub const MEMBER: u64 = 0x1a095090689d4647;

    /// Parameter position mixing constants, so `(int, string)` and
    /// `(string, int)` hash differently.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit hash identifying a foreign type or callable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// `const` twin of [`TypeHash::from_name`]; both produce the same value.
    pub const fn of_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ const_xxh64::xxh64(name.as_bytes(), 0))
    }

    /// Create a method hash from declaring type, name and parameter types.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a constructor hash from declaring type and parameter types.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Create a hash for a field or property of `owner`.
    #[inline]
    pub fn from_member(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::MEMBER ^ owner.0 ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the hash of a generic type or method specialization.
    ///
    /// Argument order matters: `Dictionary<int, string>` and
    /// `Dictionary<string, int>` are different types.
    #[inline]
    pub fn from_generic_instance(definition: TypeHash, args: &[TypeHash]) -> Self {
        TypeHash(mix_params(definition.0, args))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in params.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the combination order-sensitive
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Hashes of the foreign runtime types the bridge itself needs to recognise.
pub mod well_known {
    use super::TypeHash;

    /// `System.Void`, the return type of procedures.
    pub const VOID: TypeHash = TypeHash::of_name("System.Void");
    pub const OBJECT: TypeHash = TypeHash::of_name("System.Object");
    pub const BOOLEAN: TypeHash = TypeHash::of_name("System.Boolean");
    pub const SBYTE: TypeHash = TypeHash::of_name("System.SByte");
    pub const INT16: TypeHash = TypeHash::of_name("System.Int16");
    pub const INT32: TypeHash = TypeHash::of_name("System.Int32");
    pub const INT64: TypeHash = TypeHash::of_name("System.Int64");
    pub const BYTE: TypeHash = TypeHash::of_name("System.Byte");
    pub const UINT16: TypeHash = TypeHash::of_name("System.UInt16");
    pub const UINT32: TypeHash = TypeHash::of_name("System.UInt32");
    pub const UINT64: TypeHash = TypeHash::of_name("System.UInt64");
    pub const SINGLE: TypeHash = TypeHash::of_name("System.Single");
    pub const DOUBLE: TypeHash = TypeHash::of_name("System.Double");
    pub const STRING: TypeHash = TypeHash::of_name("System.String");
    /// Base of every array type.
    pub const ARRAY: TypeHash = TypeHash::of_name("System.Array");
    /// Base of every delegate type.
    pub const DELEGATE: TypeHash = TypeHash::of_name("System.Delegate");
    pub const ENUM: TypeHash = TypeHash::of_name("System.Enum");
    pub const VALUE_TYPE: TypeHash = TypeHash::of_name("System.ValueType");

    /// Open generic definitions used by structural conversion.
    pub const LIST: TypeHash = TypeHash::of_name("System.Collections.Generic.List`1");
    pub const DICTIONARY: TypeHash =
        TypeHash::of_name("System.Collections.Generic.Dictionary`2");
    pub const IENUMERABLE: TypeHash =
        TypeHash::of_name("System.Collections.Generic.IEnumerable`1");
    pub const ILIST: TypeHash = TypeHash::of_name("System.Collections.Generic.IList`1");
    pub const IDICTIONARY: TypeHash =
        TypeHash::of_name("System.Collections.Generic.IDictionary`2");
    pub const KEY_VALUE_PAIR: TypeHash =
        TypeHash::of_name("System.Collections.Generic.KeyValuePair`2");

    /// Non-generic collection interfaces, used when formatting.
    pub const NONGENERIC_ILIST: TypeHash = TypeHash::of_name("System.Collections.IList");
    pub const NONGENERIC_IDICTIONARY: TypeHash =
        TypeHash::of_name("System.Collections.IDictionary");
}
