//! Conversion of call arguments into chaincode strings and of chaincode
//! payloads back into declared native types.

use crate::metadata::Fabric;
use chainbind_core::convert::{check_instance, ConversionHints, TypeConverter};
use chainbind_core::types::ObjectValue;
use chainbind_core::{ConvertError, EventBinding, MethodBinding, NativeType, ParameterBinding, TypeConverters, Value};
use num_bigint::BigInt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts between a scalar native type and its plain text form.
///
/// Numbers are written and parsed without grouping or locale specific
/// separators; booleans parse `true` case-insensitively and anything else as
/// `false`.
#[derive(Debug, Clone)]
pub struct StringConverter {
    name: &'static str,
    source: NativeType,
    target: NativeType,
}

impl StringConverter {
    fn new(name: &'static str, source: NativeType) -> Self {
        Self {
            name,
            source,
            target: NativeType::String,
        }
    }

    /// `bool <-> String`
    pub fn boolean() -> Self {
        Self::new("BooleanStringConverter", NativeType::Bool)
    }

    /// `i8 <-> String`
    pub fn byte() -> Self {
        Self::new("ByteStringConverter", NativeType::Byte)
    }

    /// `i16 <-> String`
    pub fn short() -> Self {
        Self::new("ShortStringConverter", NativeType::Short)
    }

    /// `i32 <-> String`
    pub fn integer() -> Self {
        Self::new("IntegerStringConverter", NativeType::Int)
    }

    /// `i64 <-> String`
    pub fn long() -> Self {
        Self::new("LongStringConverter", NativeType::Long)
    }

    /// `f32 <-> String`
    pub fn float() -> Self {
        Self::new("FloatStringConverter", NativeType::Float)
    }

    /// `f64 <-> String`
    pub fn double() -> Self {
        Self::new("DoubleStringConverter", NativeType::Double)
    }

    /// `BigInt <-> String`
    pub fn big_integer() -> Self {
        Self::new("BigIntegerStringConverter", NativeType::BigInteger)
    }

    fn parse(&self, text: &str) -> Result<Value, ConvertError> {
        let text = text.trim();
        let failed = |e: &dyn std::fmt::Display| {
            ConvertError::conversion_failed(&self.source, NativeType::String, format!("'{}': {}", text, e))
        };
        match self.source {
            NativeType::Bool => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
            NativeType::Byte => text.parse().map(Value::Byte).map_err(|e| failed(&e)),
            NativeType::Short => text.parse().map(Value::Short).map_err(|e| failed(&e)),
            NativeType::Int => text.parse().map(Value::Int).map_err(|e| failed(&e)),
            NativeType::Long => text.parse().map(Value::Long).map_err(|e| failed(&e)),
            NativeType::Float => text.parse().map(Value::Float).map_err(|e| failed(&e)),
            NativeType::Double => text.parse().map(Value::Double).map_err(|e| failed(&e)),
            NativeType::BigInteger => text.parse::<BigInt>().map(Value::BigInteger).map_err(|e| failed(&e)),
            _ => Err(failed(&"unsupported type")),
        }
    }
}

impl TypeConverter for StringConverter {
    fn name(&self) -> &str {
        self.name
    }

    fn source_type(&self) -> &NativeType {
        &self.source
    }

    fn target_type(&self) -> &NativeType {
        &self.target
    }

    fn to_target(&self, value: Value) -> Result<Value, ConvertError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if !value.is_instance_of(&self.source) {
            return Err(ConvertError::type_mismatch(&self.source, value.native_type()));
        }
        Ok(Value::String(value.to_string()))
    }

    fn to_source(&self, value: Value) -> Result<Value, ConvertError> {
        match value {
            Value::String(text) => self.parse(&text),
            Value::Null => Ok(Value::Null),
            other => Err(ConvertError::type_mismatch(NativeType::String, other.native_type())),
        }
    }
}

/// The string converters every chaincode binding starts with.
pub fn default_string_converters() -> Vec<StringConverter> {
    vec![
        StringConverter::boolean(),
        StringConverter::byte(),
        StringConverter::short(),
        StringConverter::integer(),
        StringConverter::long(),
        StringConverter::float(),
        StringConverter::double(),
        StringConverter::big_integer(),
    ]
}

/// Registers [`default_string_converters`] with `registry`.
pub fn register_default_converters(registry: &mut TypeConverters) -> Result<(), ConvertError> {
    for converter in default_string_converters() {
        registry.register(converter)?;
    }
    Ok(())
}

/// Marshals arguments and unmarshals payloads of chaincode calls.
#[derive(Debug, Clone)]
pub struct FabricArgumentConverter {
    converters: Arc<TypeConverters>,
}

impl Default for FabricArgumentConverter {
    fn default() -> Self {
        let mut registry = TypeConverters::new();
        if let Err(e) = register_default_converters(&mut registry) {
            warn!("Failed to register default string converters: {}", e);
        }
        Self::new(Arc::new(registry))
    }
}

impl FabricArgumentConverter {
    /// Creates a converter backed by `converters`.
    pub fn new(converters: Arc<TypeConverters>) -> Self {
        Self { converters }
    }

    /// The type converter registry.
    pub fn converters(&self) -> &TypeConverters {
        &self.converters
    }

    /// Converts the contract arguments of a call, in parameter order.
    ///
    /// Null arguments are left out of the chaincode argument list.
    pub fn convert_arguments<'a, I>(&self, parameters: I, args: Vec<Value>) -> Result<Vec<String>, ConvertError>
    where
        I: IntoIterator<Item = &'a ParameterBinding<Fabric>>,
    {
        let parameters: Vec<_> = parameters.into_iter().collect();
        if parameters.len() != args.len() {
            return Err(ConvertError::ArgumentCount {
                declared: parameters.len(),
                actual: args.len(),
            });
        }
        let mut converted = Vec::with_capacity(args.len());
        for (parameter, value) in parameters.into_iter().zip(args) {
            if value.is_null() {
                debug!("Skipping null argument '{}'", parameter.name());
                continue;
            }
            converted.push(self.convert_argument(parameter, value)?);
        }
        Ok(converted)
    }

    /// Converts one contract argument into its chaincode string.
    pub fn convert_argument(&self, parameter: &ParameterBinding<Fabric>, value: Value) -> Result<String, ConvertError> {
        if let (Some(pass_as), None) = (parameter.pass_as(), parameter.converter()) {
            if *pass_as != NativeType::String {
                return Err(ConvertError::conversion_failed(
                    pass_as,
                    parameter.ty(),
                    format!(
                        "Pass-as type of parameter '{}' must be String, chaincode arguments are strings",
                        parameter.name()
                    ),
                ));
            }
        }
        let hints = ConversionHints {
            converter: parameter.converter(),
            pass_as: parameter.pass_as(),
            lenient: true,
        };
        let prepared = self.converters.prepare(value, parameter.ty(), hints)?;
        let text = self.to_wire(prepared.value, &prepared.ty)?;
        debug!("Converted argument '{}' to chaincode string", parameter.name());
        Ok(text)
    }

    fn to_wire(&self, value: Value, declared: &NativeType) -> Result<String, ConvertError> {
        if let Value::String(text) = value {
            return Ok(text);
        }
        let runtime = value.native_type();
        match self.converters.convert_matching(value, declared, &NativeType::String)? {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(ConvertError::type_mismatch(NativeType::String, other.native_type())),
            None => Err(ConvertError::no_converter(NativeType::String, runtime)),
        }
    }

    /// Converts the payload returned by a method into its declared result type.
    pub fn convert_method_result(&self, method: &MethodBinding<Fabric>, payload: String) -> Result<Value, ConvertError> {
        if method.is_void_return() {
            return Ok(Value::Unit);
        }
        self.convert_result(method.result_type(), method.result_converter(), payload)
    }

    /// Converts a chaincode payload into `declared`.
    ///
    /// An empty payload is `null` for every type a string cannot be assigned to.
    pub fn convert_result(
        &self,
        declared: &NativeType,
        converter: Option<&str>,
        payload: String,
    ) -> Result<Value, ConvertError> {
        if *declared == NativeType::Void {
            return Ok(Value::Unit);
        }
        let value = Value::String(payload);
        if converter.is_none() && value.is_instance_of(declared) {
            return Ok(value);
        }
        if value.as_str() == Some("") && Value::Null.is_instance_of(declared) {
            return Ok(Value::Null);
        }

        let converted = match converter {
            Some(name) => self
                .converters
                .convert_with(name, value, &NativeType::String, true)?
                .map(|typed| typed.value),
            None => self.converters.convert_matching(value, &NativeType::String, declared)?,
        };
        match converted {
            Some(value) => check_instance(value, declared),
            None => Err(ConvertError::no_converter(declared, NativeType::String)),
        }
    }

    /// Materializes an event object from a chaincode event payload.
    pub fn create_event_object(&self, event: &EventBinding<Fabric>, payload: String) -> Result<Value, ConvertError> {
        let descriptor = event.event_type();
        let field = event.fields().iter().find(|f| f.chain().from_payload).ok_or_else(|| {
            ConvertError::conversion_failed(
                NativeType::named(&descriptor.name),
                NativeType::String,
                format!("Cannot create event object for event '{}', no field receives the payload", event.event_name()),
            )
        })?;

        let mut object = ObjectValue::with_fields(&descriptor.name, descriptor.fields.iter().map(|f| f.name.clone()));
        let value = self.convert_result(field.ty(), field.converter(), payload)?;
        object.set(field.field(), value);
        Ok(Value::Object(object))
    }
}
