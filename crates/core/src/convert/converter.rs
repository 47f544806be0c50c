//! Bidirectional scalar converters.

use crate::error::ConvertError;
use crate::types::{NativeType, Value};
use std::fmt;
use std::sync::Arc;

/// Converts values between exactly two native types.
///
/// `to_target` maps a source value onto the target type and `to_source` is
/// its inverse. Converters are referenced from bindings by [`name`](Self::name).
pub trait TypeConverter: Send + Sync + fmt::Debug {
    /// Unique name used in persisted bindings.
    fn name(&self) -> &str;

    /// Type accepted by [`to_target`](Self::to_target).
    fn source_type(&self) -> &NativeType;

    /// Type produced by [`to_target`](Self::to_target).
    fn target_type(&self) -> &NativeType;

    /// Converts a source value into the target type.
    fn to_target(&self, value: Value) -> Result<Value, ConvertError>;

    /// Converts a target value back into the source type.
    fn to_source(&self, value: Value) -> Result<Value, ConvertError>;
}

type ConvertFn = Arc<dyn Fn(Value) -> Result<Value, ConvertError> + Send + Sync>;

/// A converter assembled from two closures.
#[derive(Clone)]
pub struct FnConverter {
    name: String,
    source: NativeType,
    target: NativeType,
    forward: ConvertFn,
    backward: ConvertFn,
}

impl FnConverter {
    /// Creates a converter from its forward and backward functions.
    pub fn new<S, F, B>(name: S, source: NativeType, target: NativeType, forward: F, backward: B) -> Self
    where
        S: Into<String>,
        F: Fn(Value) -> Result<Value, ConvertError> + Send + Sync + 'static,
        B: Fn(Value) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source,
            target,
            forward: Arc::new(forward),
            backward: Arc::new(backward),
        }
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

impl TypeConverter for FnConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &NativeType {
        &self.source
    }

    fn target_type(&self) -> &NativeType {
        &self.target
    }

    fn to_target(&self, value: Value) -> Result<Value, ConvertError> {
        (self.forward)(value)
    }

    fn to_source(&self, value: Value) -> Result<Value, ConvertError> {
        (self.backward)(value)
    }
}

/// `Uuid <-> String` using the hyphenated lowercase form.
#[derive(Debug, Clone)]
pub struct UuidStringConverter {
    source: NativeType,
    target: NativeType,
}

impl UuidStringConverter {
    /// Registry name of this converter.
    pub const NAME: &'static str = "UuidStringConverter";

    /// Creates the converter.
    pub fn new() -> Self {
        Self {
            source: NativeType::Uuid,
            target: NativeType::String,
        }
    }
}

impl Default for UuidStringConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeConverter for UuidStringConverter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn source_type(&self) -> &NativeType {
        &self.source
    }

    fn target_type(&self) -> &NativeType {
        &self.target
    }

    fn to_target(&self, value: Value) -> Result<Value, ConvertError> {
        match value {
            Value::Uuid(uuid) => Ok(Value::String(uuid.hyphenated().to_string())),
            Value::Null => Ok(Value::Null),
            other => Err(ConvertError::type_mismatch(NativeType::Uuid, other.native_type())),
        }
    }

    fn to_source(&self, value: Value) -> Result<Value, ConvertError> {
        match value {
            Value::String(text) => uuid::Uuid::parse_str(&text)
                .map(Value::Uuid)
                .map_err(|e| ConvertError::conversion_failed(NativeType::Uuid, NativeType::String, e.to_string())),
            Value::Null => Ok(Value::Null),
            other => Err(ConvertError::type_mismatch(NativeType::String, other.native_type())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_uuid_string_converter_both_directions() {
        let converter = UuidStringConverter::new();
        let id = Uuid::new_v4();

        let text = converter.to_target(Value::Uuid(id)).unwrap();
        assert_eq!(text, Value::String(id.to_string()));
        assert_eq!(converter.to_source(text).unwrap(), Value::Uuid(id));
        assert!(converter.to_source(Value::from("not-a-uuid")).is_err());
    }

    #[test]
    fn test_fn_converter_applies_closures() {
        let converter = FnConverter::new(
            "IntString",
            NativeType::Int,
            NativeType::String,
            |v| Ok(Value::String(v.to_string())),
            |v| match v {
                Value::String(s) => s
                    .parse::<i32>()
                    .map(Value::Int)
                    .map_err(|e| ConvertError::conversion_failed(NativeType::Int, NativeType::String, e.to_string())),
                other => Err(ConvertError::type_mismatch(NativeType::String, other.native_type())),
            },
        );

        assert_eq!(converter.to_target(Value::Int(5)).unwrap(), Value::from("5"));
        assert_eq!(converter.to_source(Value::from("12")).unwrap(), Value::Int(12));
    }
}
