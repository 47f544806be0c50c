//! Dynamic application values passed through the binding layer.

use super::NativeType;
use crate::error::ConvertError;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A value crossing the binding boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of a void method.
    Unit,
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8 bit signed integer.
    Byte(i8),
    /// 16 bit signed integer.
    Short(i16),
    /// 32 bit signed integer.
    Int(i32),
    /// 64 bit signed integer.
    Long(i64),
    /// 32 bit float.
    Float(f32),
    /// 64 bit float.
    Double(f64),
    /// Arbitrary precision integer.
    BigInteger(BigInt),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UUID.
    Uuid(Uuid),
    /// Fixed shape array.
    Array(Vec<Value>),
    /// Ordered list.
    List(Vec<Value>),
    /// Deduplicated set; construct with [`Value::set`].
    Set(Vec<Value>),
    /// Named record such as an event object.
    Object(ObjectValue),
    /// Host value the binding layer only passes through.
    Opaque(OpaqueValue),
}

/// A named record with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    /// Type name the object was created for.
    pub type_name: String,
    /// Field values in declaration order.
    pub fields: IndexMap<String, Value>,
}

impl ObjectValue {
    /// Creates an object whose fields are all `Null`.
    pub fn with_fields<I, S>(type_name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.to_string(),
            fields: fields.into_iter().map(|f| (f.into(), Value::Null)).collect(),
        }
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field value.
    pub fn set<S: Into<String>>(&mut self, field: S, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

/// A shared host value identified by a type name.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    /// Wraps a host value.
    pub fn new<T: Any + Send + Sync, S: Into<String>>(type_name: S, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    /// Name of the wrapped type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrows the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Value {
    /// Builds a set, dropping duplicate elements while keeping first occurrences.
    pub fn set(values: Vec<Value>) -> Self {
        let mut unique: Vec<Value> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        Value::Set(unique)
    }

    /// Wraps a host value.
    pub fn opaque<T: Any + Send + Sync, S: Into<String>>(type_name: S, value: T) -> Self {
        Value::Opaque(OpaqueValue::new(type_name, value))
    }

    /// Whether the value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime type of the value.
    ///
    /// Containers report their element type when all elements agree, `Any` otherwise.
    pub fn native_type(&self) -> NativeType {
        match self {
            Value::Unit => NativeType::Void,
            Value::Null => NativeType::Any,
            Value::Bool(_) => NativeType::Bool,
            Value::Byte(_) => NativeType::Byte,
            Value::Short(_) => NativeType::Short,
            Value::Int(_) => NativeType::Int,
            Value::Long(_) => NativeType::Long,
            Value::Float(_) => NativeType::Float,
            Value::Double(_) => NativeType::Double,
            Value::BigInteger(_) => NativeType::BigInteger,
            Value::String(_) => NativeType::String,
            Value::Bytes(_) => NativeType::Bytes,
            Value::Uuid(_) => NativeType::Uuid,
            Value::Array(items) => NativeType::array(common_type(items)),
            Value::List(items) => NativeType::list(common_type(items)),
            Value::Set(items) => NativeType::set(common_type(items)),
            Value::Object(object) => NativeType::Named(object.type_name.clone()),
            Value::Opaque(opaque) => NativeType::Named(opaque.type_name.clone()),
        }
    }

    /// Whether the value can be used where `ty` is declared.
    ///
    /// `Null` satisfies every non-primitive type.
    pub fn is_instance_of(&self, ty: &NativeType) -> bool {
        match (ty, self) {
            (NativeType::Any, _) => true,
            (NativeType::Void, Value::Unit) => true,
            (ty, Value::Null) => !ty.is_primitive() && *ty != NativeType::Void,
            (NativeType::Array(inner), Value::Array(items))
            | (NativeType::List(inner), Value::List(items))
            | (NativeType::Set(inner), Value::Set(items))
            | (NativeType::Collection(inner), Value::List(items))
            | (NativeType::Collection(inner), Value::Set(items)) => {
                items.iter().all(|item| item.is_instance_of(inner))
            }
            (NativeType::Named(name), Value::Object(object)) => *name == object.type_name,
            (NativeType::Named(name), Value::Opaque(opaque)) => name == opaque.type_name(),
            (ty, _) if ty.is_sequence() => false,
            (ty, value) => value.native_type() == *ty,
        }
    }

    /// Elements of arrays, lists and sets.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Consumes a container value into its elements.
    pub fn into_elements(self) -> Result<Vec<Value>, Value> {
        match self {
            Value::Array(items) | Value::List(items) | Value::Set(items) => Ok(items),
            other => Err(other),
        }
    }

    /// Borrows a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value is numeric.
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::BigInteger(_)
        )
    }

    /// Integral value of a number, truncating floats.
    ///
    /// Returns `None` for non-numbers and big integers outside the `i64` range.
    pub fn to_long(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Double(v) => Some(*v as i64),
            Value::BigInteger(v) => v.to_i64(),
            _ => None,
        }
    }

    /// Big integer view of a number; floats are truncated.
    pub fn to_big_integer(&self) -> Option<BigInt> {
        match self {
            Value::BigInteger(v) => Some(v.clone()),
            other => other.to_long().map(BigInt::from),
        }
    }

    /// Floating point view of a number.
    pub fn to_double(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::BigInteger(v) => v.to_f64(),
            other => other.to_long().map(|v| v as f64),
        }
    }

    /// Narrowing or widening conversion of a number into a fixed width numeric type.
    ///
    /// Integer targets wrap like a two's complement cast.
    pub fn coerce_number(&self, target: &NativeType) -> Option<Value> {
        if !self.is_number() {
            return None;
        }
        let integral = || match self {
            Value::BigInteger(v) => {
                let (sign, digits) = v.to_u64_digits();
                let low = digits.first().copied().unwrap_or(0) as i64;
                Some(if sign == num_bigint::Sign::Minus { low.wrapping_neg() } else { low })
            }
            other => other.to_long(),
        };
        match target {
            NativeType::Byte => integral().map(|v| Value::Byte(v as i8)),
            NativeType::Short => integral().map(|v| Value::Short(v as i16)),
            NativeType::Int => integral().map(|v| Value::Int(v as i32)),
            NativeType::Long => integral().map(Value::Long),
            NativeType::Float => self.to_double().map(|v| Value::Float(v as f32)),
            NativeType::Double => self.to_double().map(Value::Double),
            _ => None,
        }
    }
}

fn common_type(items: &[Value]) -> NativeType {
    let mut types = items.iter().filter(|v| !v.is_null()).map(Value::native_type);
    match types.next() {
        Some(first) if types.all(|t| t == first) => first,
        _ => NativeType::Any,
    }
}

/// A value paired with the type it was declared as.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    /// Declared type.
    pub ty: NativeType,
    /// The value.
    pub value: Value,
}

impl TypedValue {
    /// Pairs a value with a declared type.
    pub fn new(ty: NativeType, value: Value) -> Self {
        Self { ty, value }
    }

    /// Pairs a value with its own runtime type.
    pub fn of(value: Value) -> Self {
        Self {
            ty: value.native_type(),
            value,
        }
    }
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident, $native:expr;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ConvertError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ConvertError::type_mismatch($native, other.native_type())),
                    }
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool, NativeType::Bool;
    i8 => Byte, NativeType::Byte;
    i16 => Short, NativeType::Short;
    i32 => Int, NativeType::Int;
    i64 => Long, NativeType::Long;
    f32 => Float, NativeType::Float;
    f64 => Double, NativeType::Double;
    BigInt => BigInteger, NativeType::BigInteger;
    String => String, NativeType::String;
    Vec<u8> => Bytes, NativeType::Bytes;
    Uuid => Uuid, NativeType::Uuid;
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::BigInteger(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
            Value::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Array(items) | Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "{} {{ {} fields }}", object.type_name, object.fields.len()),
            Value::Opaque(opaque) => write!(f, "<{}>", opaque.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_first_occurrence_order() {
        let set = Value::set(vec![Value::from(3), Value::from(1), Value::from(3)]);
        assert_eq!(set, Value::Set(vec![Value::Int(3), Value::Int(1)]));
    }

    #[test]
    fn test_instance_checks_follow_containers() {
        let list = Value::List(vec![Value::from("a"), Value::Null]);
        assert!(list.is_instance_of(&NativeType::list(NativeType::String)));
        assert!(list.is_instance_of(&NativeType::collection(NativeType::String)));
        assert!(!list.is_instance_of(&NativeType::array(NativeType::String)));
        assert!(!Value::Null.is_instance_of(&NativeType::Int));
        assert!(Value::Null.is_instance_of(&NativeType::BigInteger));
    }

    #[test]
    fn test_number_coercion_truncates() {
        let big = Value::BigInteger(BigInt::from(300));
        assert_eq!(big.coerce_number(&NativeType::Byte), Some(Value::Byte(44)));
        assert_eq!(big.coerce_number(&NativeType::Int), Some(Value::Int(300)));
        assert_eq!(Value::Double(2.9).coerce_number(&NativeType::Long), Some(Value::Long(2)));
        assert_eq!(Value::from("1").coerce_number(&NativeType::Int), None);
    }

    #[test]
    fn test_native_type_of_mixed_list_is_any() {
        let mixed = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(mixed.native_type(), NativeType::list(NativeType::Any));
        let ints = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(ints.native_type(), NativeType::array(NativeType::Int));
    }

    #[test]
    fn test_opaque_downcast() {
        let value = OpaqueValue::new("Counter", 7u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(value.clone(), value);
    }
}
