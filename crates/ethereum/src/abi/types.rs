//! Solidity type strings.

use chainbind_core::{ConvertError, NativeType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Matches the last array suffix of a type string. The greedy prefix keeps all
/// inner dimensions, so `uint16[3][5]` splits into `uint16[3]` and `5`.
static ARRAY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)\[(\d*)]$").expect("array suffix pattern is valid"));

/// A parsed Solidity ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintN`
    Uint(u16),
    /// `intN`
    Int(u16),
    /// `bool`
    Bool,
    /// `address`
    Address,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `bytesN`
    FixedBytes(u8),
    /// `T[N]` or `T[]`
    Array {
        /// Element type.
        element: Box<AbiType>,
        /// Length of static arrays.
        length: Option<usize>,
    },
}

impl AbiType {
    /// Parses a type string such as `uint16[3][5]`.
    pub fn parse(text: &str) -> Result<Self, ConvertError> {
        let text = text.trim();
        if let Some(captures) = ARRAY_SUFFIX.captures(text) {
            let element = AbiType::parse(&captures[1])?;
            let length = match &captures[2] {
                "" => None,
                digits => Some(
                    digits
                        .parse::<usize>()
                        .map_err(|e| ConvertError::malformed_wire_type(text, e.to_string()))?,
                ),
            };
            return Ok(AbiType::Array {
                element: Box::new(element),
                length,
            });
        }

        match text {
            "bool" => return Ok(AbiType::Bool),
            "address" => return Ok(AbiType::Address),
            "string" => return Ok(AbiType::String),
            "bytes" => return Ok(AbiType::Bytes),
            "uint" => return Ok(AbiType::Uint(256)),
            "int" => return Ok(AbiType::Int(256)),
            _ => {}
        }

        if let Some(bits) = text.strip_prefix("uint") {
            return integer_bits(text, bits).map(AbiType::Uint);
        }
        if let Some(bits) = text.strip_prefix("int") {
            return integer_bits(text, bits).map(AbiType::Int);
        }
        if let Some(size) = text.strip_prefix("bytes") {
            return match size.parse::<u8>() {
                Ok(n) if (1..=32).contains(&n) => Ok(AbiType::FixedBytes(n)),
                _ => Err(ConvertError::malformed_wire_type(text, "byte array size must be between 1 and 32")),
            };
        }

        Err(ConvertError::malformed_wire_type(text, "unsupported type"))
    }

    /// Whether this is an array type.
    pub fn is_array(&self) -> bool {
        matches!(self, AbiType::Array { .. })
    }

    /// The native type wire values of this type are unwrapped into.
    ///
    /// Static and dynamic arrays both become lists.
    pub fn native_type(&self) -> NativeType {
        match self {
            AbiType::Uint(_) | AbiType::Int(_) => NativeType::BigInteger,
            AbiType::Bool => NativeType::Bool,
            AbiType::Address | AbiType::String => NativeType::String,
            AbiType::Bytes | AbiType::FixedBytes(_) => NativeType::Bytes,
            AbiType::Array { element, .. } => NativeType::list(element.native_type()),
        }
    }
}

fn integer_bits(text: &str, bits: &str) -> Result<u16, ConvertError> {
    match bits.parse::<u16>() {
        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Ok(n),
        _ => Err(ConvertError::malformed_wire_type(
            text,
            "integer width must be a multiple of 8 between 8 and 256",
        )),
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Uint(bits) => write!(f, "uint{}", bits),
            AbiType::Int(bits) => write!(f, "int{}", bits),
            AbiType::Bool => write!(f, "bool"),
            AbiType::Address => write!(f, "address"),
            AbiType::String => write!(f, "string"),
            AbiType::Bytes => write!(f, "bytes"),
            AbiType::FixedBytes(n) => write!(f, "bytes{}", n),
            AbiType::Array { element, length: Some(n) } => write!(f, "{}[{}]", element, n),
            AbiType::Array { element, length: None } => write!(f, "{}[]", element),
        }
    }
}

impl FromStr for AbiType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbiType::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_arrays_strip_the_outer_dimension_first() {
        let ty = AbiType::parse("uint16[3][5]").unwrap();
        match &ty {
            AbiType::Array { element, length } => {
                assert_eq!(*length, Some(5));
                assert_eq!(
                    **element,
                    AbiType::Array {
                        element: Box::new(AbiType::Uint(16)),
                        length: Some(3)
                    }
                );
            }
            other => panic!("expected array, got {:?}", other),
        }
        assert_eq!(ty.to_string(), "uint16[3][5]");
        assert_eq!(AbiType::parse("address[]").unwrap().to_string(), "address[]");
    }

    #[test]
    fn test_aliases_and_native_types() {
        assert_eq!(AbiType::parse("uint").unwrap(), AbiType::Uint(256));
        assert_eq!(AbiType::parse("int").unwrap(), AbiType::Int(256));
        assert_eq!(AbiType::parse("bytes32").unwrap(), AbiType::FixedBytes(32));
        assert_eq!(
            AbiType::parse("int8[][2]").unwrap().native_type(),
            NativeType::list(NativeType::list(NativeType::BigInteger))
        );
        assert_eq!(AbiType::parse("address").unwrap().native_type(), NativeType::String);
    }

    #[test]
    fn test_malformed_types_are_rejected() {
        for text in ["uint7", "int512", "bytes33", "bytes0", "tuple", "uint16[x]"] {
            assert!(
                matches!(AbiType::parse(text), Err(ConvertError::MalformedWireType { .. })),
                "{} should be rejected",
                text
            );
        }
    }
}
