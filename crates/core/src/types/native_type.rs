//! Declared application-level types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An application-level type as declared by a contract interface.
///
/// The textual form produced by [`fmt::Display`] is stable and is what the
/// persisted binding documents contain; [`FromStr`] parses it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeType {
    /// No value (`()`).
    Void,
    /// `bool`
    Bool,
    /// `i8`
    Byte,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// Arbitrary precision signed integer.
    BigInteger,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// RFC 4122 UUID.
    Uuid,
    /// Fixed shape array, `[T]`.
    Array(Box<NativeType>),
    /// Ordered list, `List<T>`.
    List(Box<NativeType>),
    /// Deduplicated set, `Set<T>`.
    Set(Box<NativeType>),
    /// Any list or set, `Collection<T>`.
    Collection(Box<NativeType>),
    /// An application-defined type identified by name (event objects, host values).
    Named(String),
    /// Accepts every value.
    Any,
}

impl NativeType {
    /// Shorthand for `[T]`.
    pub fn array(element: NativeType) -> Self {
        NativeType::Array(Box::new(element))
    }

    /// Shorthand for `List<T>`.
    pub fn list(element: NativeType) -> Self {
        NativeType::List(Box::new(element))
    }

    /// Shorthand for `Set<T>`.
    pub fn set(element: NativeType) -> Self {
        NativeType::Set(Box::new(element))
    }

    /// Shorthand for `Collection<T>`.
    pub fn collection(element: NativeType) -> Self {
        NativeType::Collection(Box::new(element))
    }

    /// Shorthand for a named type.
    pub fn named<S: Into<String>>(name: S) -> Self {
        NativeType::Named(name.into())
    }

    /// Whether this is one of the fixed width numeric types.
    pub fn is_primitive_number(&self) -> bool {
        matches!(
            self,
            NativeType::Byte
                | NativeType::Short
                | NativeType::Int
                | NativeType::Long
                | NativeType::Float
                | NativeType::Double
        )
    }

    /// Whether this is a fixed width numeric type or `bool`.
    pub fn is_primitive(&self) -> bool {
        self.is_primitive_number() || matches!(self, NativeType::Bool)
    }

    /// Whether this type describes an array or collection.
    pub fn is_sequence(&self) -> bool {
        self.element_type().is_some()
    }

    /// Element type of arrays and collections.
    pub fn element_type(&self) -> Option<&NativeType> {
        match self {
            NativeType::Array(inner)
            | NativeType::List(inner)
            | NativeType::Set(inner)
            | NativeType::Collection(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether a value declared as `source` can be used where `self` is expected.
    pub fn is_assignable_from(&self, source: &NativeType) -> bool {
        if self == source {
            return true;
        }
        match (self, source) {
            (NativeType::Any, _) => true,
            (NativeType::Collection(target), NativeType::List(inner))
            | (NativeType::Collection(target), NativeType::Set(inner))
            | (NativeType::Collection(target), NativeType::Collection(inner))
            | (NativeType::List(target), NativeType::List(inner))
            | (NativeType::Set(target), NativeType::Set(inner))
            | (NativeType::Array(target), NativeType::Array(inner)) => {
                target.is_assignable_from(inner)
            }
            _ => false,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Void => write!(f, "()"),
            NativeType::Bool => write!(f, "bool"),
            NativeType::Byte => write!(f, "i8"),
            NativeType::Short => write!(f, "i16"),
            NativeType::Int => write!(f, "i32"),
            NativeType::Long => write!(f, "i64"),
            NativeType::Float => write!(f, "f32"),
            NativeType::Double => write!(f, "f64"),
            NativeType::BigInteger => write!(f, "BigInt"),
            NativeType::String => write!(f, "String"),
            NativeType::Bytes => write!(f, "Bytes"),
            NativeType::Uuid => write!(f, "Uuid"),
            NativeType::Array(inner) => write!(f, "[{}]", inner),
            NativeType::List(inner) => write!(f, "List<{}>", inner),
            NativeType::Set(inner) => write!(f, "Set<{}>", inner),
            NativeType::Collection(inner) => write!(f, "Collection<{}>", inner),
            NativeType::Named(name) => write!(f, "{}", name),
            NativeType::Any => write!(f, "Any"),
        }
    }
}

impl FromStr for NativeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            return Ok(NativeType::array(inner.parse()?));
        }
        for (prefix, ctor) in [
            ("List<", NativeType::list as fn(NativeType) -> NativeType),
            ("Set<", NativeType::set),
            ("Collection<", NativeType::collection),
        ] {
            if let Some(inner) = s.strip_prefix(prefix).and_then(|rest| rest.strip_suffix('>')) {
                return Ok(ctor(inner.parse()?));
            }
        }

        match s {
            "()" => Ok(NativeType::Void),
            "bool" => Ok(NativeType::Bool),
            "i8" => Ok(NativeType::Byte),
            "i16" => Ok(NativeType::Short),
            "i32" => Ok(NativeType::Int),
            "i64" => Ok(NativeType::Long),
            "f32" => Ok(NativeType::Float),
            "f64" => Ok(NativeType::Double),
            "BigInt" => Ok(NativeType::BigInteger),
            "String" => Ok(NativeType::String),
            "Bytes" => Ok(NativeType::Bytes),
            "Uuid" => Ok(NativeType::Uuid),
            "Any" => Ok(NativeType::Any),
            "" => Err("Empty type name".to_string()),
            name if name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.')) =>
            {
                Ok(NativeType::Named(name.to_string()))
            }
            other => Err(format!("Unknown native type: {}", other)),
        }
    }
}

impl Serialize for NativeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NativeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
