//! Wire typed ABI values.

use super::AbiType;
use chainbind_core::{ConvertError, NativeType, Value};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed};
use std::fmt;

/// A value typed with its Solidity ABI type, as exchanged with the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer of the given width.
    Uint {
        /// Width in bits.
        bits: u16,
        /// Non-negative value.
        value: BigInt,
    },
    /// Signed integer of the given width.
    Int {
        /// Width in bits.
        bits: u16,
        /// Value.
        value: BigInt,
    },
    /// `bool`
    Bool(bool),
    /// `address`, hex encoded.
    Address(String),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `bytesN`; the length is the size.
    FixedBytes(Vec<u8>),
    /// `T[N]`
    StaticArray {
        /// Element type.
        element: AbiType,
        /// Elements.
        values: Vec<AbiValue>,
    },
    /// `T[]`
    DynamicArray {
        /// Element type.
        element: AbiType,
        /// Elements.
        values: Vec<AbiValue>,
    },
}

impl AbiValue {
    /// Type name wire values carry when wrapped into a [`Value`].
    pub const TYPE_NAME: &'static str = "AbiValue";

    /// An unsigned integer, checked against the width.
    pub fn uint(bits: u16, value: BigInt) -> Result<Self, ConvertError> {
        let fits = value.sign() != Sign::Minus && value.bits() <= u64::from(bits);
        if !fits {
            return Err(out_of_range(AbiType::Uint(bits), &value));
        }
        Ok(AbiValue::Uint { bits, value })
    }

    /// A signed integer, checked against the width.
    pub fn int(bits: u16, value: BigInt) -> Result<Self, ConvertError> {
        let magnitude = if value.is_negative() {
            -&value - BigInt::one()
        } else {
            value.clone()
        };
        if magnitude.bits() >= u64::from(bits) {
            return Err(out_of_range(AbiType::Int(bits), &value));
        }
        Ok(AbiValue::Int { bits, value })
    }

    /// A `bytesN` value; the byte count must equal `size`.
    pub fn fixed_bytes(size: u8, bytes: Vec<u8>) -> Result<Self, ConvertError> {
        if bytes.len() != usize::from(size) {
            return Err(ConvertError::conversion_failed(
                AbiType::FixedBytes(size),
                NativeType::Bytes,
                format!("expected {} bytes, got {}", size, bytes.len()),
            ));
        }
        Ok(AbiValue::FixedBytes(bytes))
    }

    /// The ABI type of this value.
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Uint { bits, .. } => AbiType::Uint(*bits),
            AbiValue::Int { bits, .. } => AbiType::Int(*bits),
            AbiValue::Bool(_) => AbiType::Bool,
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::String(_) => AbiType::String,
            AbiValue::Bytes(_) => AbiType::Bytes,
            AbiValue::FixedBytes(bytes) => AbiType::FixedBytes(u8::try_from(bytes.len()).unwrap_or(u8::MAX)),
            AbiValue::StaticArray { element, values } => AbiType::Array {
                element: Box::new(element.clone()),
                length: Some(values.len()),
            },
            AbiValue::DynamicArray { element, .. } => AbiType::Array {
                element: Box::new(element.clone()),
                length: None,
            },
        }
    }

    /// Canonical type string, e.g. `uint16[3][5]`.
    pub fn type_as_string(&self) -> String {
        self.abi_type().to_string()
    }

    /// Unwraps the value into its native form.
    pub fn to_native(&self) -> Value {
        match self {
            AbiValue::Uint { value, .. } | AbiValue::Int { value, .. } => Value::BigInteger(value.clone()),
            AbiValue::Bool(b) => Value::Bool(*b),
            AbiValue::Address(s) | AbiValue::String(s) => Value::String(s.clone()),
            AbiValue::Bytes(b) | AbiValue::FixedBytes(b) => Value::Bytes(b.clone()),
            AbiValue::StaticArray { values, .. } | AbiValue::DynamicArray { values, .. } => {
                Value::List(values.iter().map(AbiValue::to_native).collect())
            }
        }
    }

    /// Native type of [`to_native`](Self::to_native).
    pub fn native_type(&self) -> NativeType {
        self.abi_type().native_type()
    }

    /// Borrows a wire value passed through as an opaque [`Value`].
    pub fn from_value(value: &Value) -> Option<&AbiValue> {
        match value {
            Value::Opaque(opaque) => opaque.downcast_ref::<AbiValue>(),
            _ => None,
        }
    }
}

impl From<AbiValue> for Value {
    fn from(value: AbiValue) -> Self {
        Value::opaque(AbiValue::TYPE_NAME, value)
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_as_string(), self.to_native())
    }
}

fn out_of_range(ty: AbiType, value: &BigInt) -> ConvertError {
    ConvertError::conversion_failed(ty, NativeType::BigInteger, format!("{} is out of range", value))
}
