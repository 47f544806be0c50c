//! Conversion of call arguments into ABI values and of ABI results back into
//! declared native types.

use crate::abi::{AbiType, AbiValue};
use crate::api::EventValues;
use crate::metadata::AbiChain;
use chainbind_core::convert::{check_instance, ConversionHints};
use chainbind_core::types::{ObjectValue, TypedValue};
use chainbind_core::{
    CallError, ConvertError, Error, EventBinding, MethodBinding, NativeType, ParameterBinding, TypeConverters, Value,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Marshals arguments and unmarshals results of ABI chain calls.
#[derive(Debug, Clone, Default)]
pub struct AbiArgumentConverter {
    converters: Arc<TypeConverters>,
}

impl AbiArgumentConverter {
    /// Creates a converter backed by `converters`.
    pub fn new(converters: Arc<TypeConverters>) -> Self {
        Self { converters }
    }

    /// The type converter registry.
    pub fn converters(&self) -> &TypeConverters {
        &self.converters
    }

    /// Converts the contract arguments of a call, in parameter order.
    pub fn convert_arguments<'a, C, I>(&self, parameters: I, args: Vec<Value>) -> Result<Vec<AbiValue>, ConvertError>
    where
        C: AbiChain,
        I: IntoIterator<Item = &'a ParameterBinding<C>>,
    {
        let parameters: Vec<_> = parameters.into_iter().collect();
        if parameters.len() != args.len() {
            return Err(ConvertError::ArgumentCount {
                declared: parameters.len(),
                actual: args.len(),
            });
        }
        parameters
            .into_iter()
            .zip(args)
            .map(|(parameter, value)| self.convert_argument(parameter, value))
            .collect()
    }

    /// Converts one contract argument into the parameter's ABI type.
    pub fn convert_argument<C: AbiChain>(
        &self,
        parameter: &ParameterBinding<C>,
        value: Value,
    ) -> Result<AbiValue, ConvertError> {
        let solidity_type = parameter.chain().solidity_type.as_deref().ok_or_else(|| {
            ConvertError::malformed_wire_type("", format!("Parameter '{}' has no ABI type", parameter.id()))
        })?;
        let ty = AbiType::parse(solidity_type)?;
        if value.is_null() {
            return Err(ConvertError::conversion_failed(
                &ty,
                parameter.ty(),
                format!("Argument '{}' is null", parameter.name()),
            ));
        }

        let hints = ConversionHints {
            converter: parameter.converter(),
            pass_as: parameter.pass_as(),
            lenient: true,
        };
        let prepared = self.converters.prepare(value, parameter.ty(), hints)?;
        let encoded = self.encode(prepared.value, &ty)?;
        debug!("Converted argument '{}' to {}", parameter.name(), encoded.type_as_string());
        Ok(encoded)
    }

    /// Encodes a native value as `ty`.
    ///
    /// Array types take the elements of arrays, lists and sets; the outermost
    /// dimension is the last suffix of the type string. Wire values are passed
    /// through when their type matches.
    pub fn encode(&self, value: Value, ty: &AbiType) -> Result<AbiValue, ConvertError> {
        if let Some(wire) = AbiValue::from_value(&value) {
            let actual = wire.abi_type();
            if actual != *ty {
                return Err(ConvertError::type_mismatch(ty, actual));
            }
            return Ok(wire.clone());
        }

        match ty {
            AbiType::Array { element, length } => {
                let items = value.into_elements().map_err(|other| {
                    ConvertError::conversion_failed(
                        ty,
                        other.native_type(),
                        format!("Cannot convert argument '{}' to type '{}', argument is not iterable.", other, ty),
                    )
                })?;
                if let Some(expected) = length {
                    if items.len() != *expected {
                        return Err(ConvertError::conversion_failed(
                            ty,
                            NativeType::list(NativeType::Any),
                            format!("expected {} elements, got {}", expected, items.len()),
                        ));
                    }
                }
                let values = items
                    .into_iter()
                    .map(|item| self.encode(item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                let element = (**element).clone();
                Ok(match length {
                    Some(_) => AbiValue::StaticArray { element, values },
                    None => AbiValue::DynamicArray { element, values },
                })
            }
            AbiType::Uint(bits) => AbiValue::uint(*bits, self.big_integer(value, ty)?),
            AbiType::Int(bits) => AbiValue::int(*bits, self.big_integer(value, ty)?),
            AbiType::Bool => match self.leaf(value, &NativeType::Bool)? {
                Value::Bool(b) => Ok(AbiValue::Bool(b)),
                other => Err(ConvertError::type_mismatch(NativeType::Bool, other.native_type())),
            },
            AbiType::Address => self.string(value).map(AbiValue::Address),
            AbiType::String => self.string(value).map(AbiValue::String),
            AbiType::Bytes => self.bytes(value).map(AbiValue::Bytes),
            AbiType::FixedBytes(size) => AbiValue::fixed_bytes(*size, self.bytes(value)?),
        }
    }

    fn big_integer(&self, value: Value, ty: &AbiType) -> Result<num_bigint::BigInt, ConvertError> {
        // Integral values widen losslessly; anything else goes through the registry.
        match &value {
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::BigInteger(_) => {
                if let Some(number) = value.to_big_integer() {
                    return Ok(number);
                }
            }
            _ => {}
        }
        match self.leaf(value, &NativeType::BigInteger)? {
            Value::BigInteger(number) => Ok(number),
            other => Err(ConvertError::type_mismatch(ty, other.native_type())),
        }
    }

    fn string(&self, value: Value) -> Result<String, ConvertError> {
        match self.leaf(value, &NativeType::String)? {
            Value::String(s) => Ok(s),
            other => Err(ConvertError::type_mismatch(NativeType::String, other.native_type())),
        }
    }

    fn bytes(&self, value: Value) -> Result<Vec<u8>, ConvertError> {
        match self.leaf(value, &NativeType::Bytes)? {
            Value::Bytes(b) => Ok(b),
            other => Err(ConvertError::type_mismatch(NativeType::Bytes, other.native_type())),
        }
    }

    /// Brings a scalar into the native type an ABI constructor takes.
    fn leaf(&self, value: Value, native: &NativeType) -> Result<Value, ConvertError> {
        if value.is_instance_of(native) {
            return Ok(value);
        }
        let runtime = value.native_type();
        match self.converters.convert_matching(value, &runtime, native)? {
            Some(converted) => check_instance(converted, native),
            None => Err(ConvertError::no_converter(native, runtime)),
        }
    }

    /// Converts the values returned by a method into its declared result type.
    pub fn convert_method_result<C: AbiChain>(
        &self,
        method: &MethodBinding<C>,
        results: Vec<AbiValue>,
    ) -> Result<Value, Error> {
        if method.is_void_return() {
            return Ok(Value::Unit);
        }
        if results.is_empty() {
            return Err(CallError::MissingResult {
                method: method.contract_method_name().to_string(),
                declared: method.result_type().to_string(),
            }
            .into());
        }
        Ok(self.convert_result(method.result_type(), method.result_converter(), results)?)
    }

    /// Converts wire results into `declared`.
    ///
    /// The whole list is tried first, through `converter` or a matching
    /// registry converter. Failing that a single result is unwrapped and
    /// converted on its own, while several results are converted as one list.
    pub fn convert_result(
        &self,
        declared: &NativeType,
        converter: Option<&str>,
        mut results: Vec<AbiValue>,
    ) -> Result<Value, ConvertError> {
        let list_type = NativeType::list(NativeType::Any);
        let natives = Value::List(results.iter().map(AbiValue::to_native).collect());

        let whole = match converter {
            Some(name) => self
                .converters
                .convert_with(name, natives.clone(), &list_type, false)?
                .map(|typed| typed.value),
            None => self.converters.convert_matching(natives.clone(), &list_type, declared)?,
        };
        if let Some(value) = whole {
            return check_instance(value, declared);
        }

        if results.len() == 1 {
            let single = results.remove(0);
            let typed = TypedValue::new(single.native_type(), single.to_native());
            self.convert_internal(declared, converter, typed)
        } else {
            self.convert_internal(declared, None, TypedValue::new(list_type, natives))
        }
    }

    fn convert_internal(
        &self,
        declared: &NativeType,
        converter: Option<&str>,
        typed: TypedValue,
    ) -> Result<Value, ConvertError> {
        if declared.is_assignable_from(&typed.ty) || typed.value.is_instance_of(declared) {
            return Ok(typed.value);
        }

        let converted = match converter {
            Some(name) => self
                .converters
                .convert_with(name, typed.value.clone(), &typed.ty, false)?
                .map(|t| t.value),
            None => self.converters.convert_matching(typed.value.clone(), &typed.ty, declared)?,
        };
        if let Some(value) = converted {
            return check_instance(value, declared);
        }

        if let (Some(element), Some(items)) = (declared.element_type(), typed.value.elements()) {
            let actual_element = typed.ty.element_type().cloned().unwrap_or(NativeType::Any);
            let values = items
                .iter()
                .cloned()
                .map(|item| {
                    let ty = match &actual_element {
                        NativeType::Any => item.native_type(),
                        ty => ty.clone(),
                    };
                    self.convert_internal(element, None, TypedValue::new(ty, item))
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(match declared {
                NativeType::Array(_) => Value::Array(values),
                NativeType::Set(_) => Value::set(values),
                _ => Value::List(values),
            });
        }

        if declared.is_primitive_number() {
            if let Some(number) = typed.value.coerce_number(declared) {
                return Ok(number);
            }
        }

        Err(ConvertError::conversion_failed(
            declared,
            &typed.ty,
            format!("Implicit conversion failed, unable to convert '{}' to '{}'", typed.ty, declared),
        ))
    }

    /// Materializes an event object from the decoded values of one log.
    pub fn create_event_object<C: AbiChain>(
        &self,
        event: &EventBinding<C>,
        values: &EventValues,
    ) -> Result<Value, ConvertError> {
        let descriptor = event.event_type();
        let mut object = ObjectValue::with_fields(&descriptor.name, descriptor.fields.iter().map(|f| f.name.clone()));

        for field in event.fields() {
            let source = field.chain();
            let raw = if source.indexed {
                values.indexed.get(source.slot)
            } else {
                values.non_indexed.get(source.slot)
            };
            match raw {
                Some(raw) => {
                    let value = self.convert_result(field.ty(), field.converter(), vec![raw.clone()])?;
                    object.set(field.field(), value);
                }
                None => warn!("Event did not contain value for field '{}'", source.name),
            }
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbind_core::convert::FnConverter;
    use num_bigint::BigInt;

    fn uint(bits: u16, value: i64) -> AbiValue {
        AbiValue::uint(bits, BigInt::from(value)).unwrap()
    }

    fn converter() -> AbiArgumentConverter {
        AbiArgumentConverter::default()
    }

    #[test]
    fn test_two_dimensional_array_reverses_dimensions() {
        let native = Value::Array(
            (0..5)
                .map(|row| Value::Array((0..3).map(|col| Value::Short(row * 3 + col)).collect()))
                .collect(),
        );
        let ty = AbiType::parse("uint16[3][5]").unwrap();
        let encoded = converter().encode(native.clone(), &ty).unwrap();

        assert_eq!(encoded.type_as_string(), "uint16[3][5]");
        match &encoded {
            AbiValue::StaticArray { values, .. } => {
                assert_eq!(values.len(), 5);
                assert!(values.iter().all(|row| row.type_as_string() == "uint16[3]"));
            }
            other => panic!("expected static array, got {:?}", other),
        }

        let declared = NativeType::array(NativeType::array(NativeType::Short));
        let decoded = converter().convert_result(&declared, None, vec![encoded]).unwrap();
        assert_eq!(decoded, native);
    }

    #[test]
    fn test_floats_need_a_converter_for_integer_types() {
        let err = converter().encode(Value::Double(1.5), &AbiType::Uint(8)).unwrap_err();
        assert!(matches!(err, ConvertError::NoConverter { .. }));
        assert!(converter().encode(Value::Float(2.0), &AbiType::Int(256)).is_err());

        assert_eq!(converter().encode(Value::Short(7), &AbiType::Uint(8)).unwrap(), uint(8, 7));
        assert_eq!(
            converter().encode(Value::BigInteger(BigInt::from(-3)), &AbiType::Int(32)).unwrap(),
            AbiValue::int(32, BigInt::from(-3)).unwrap()
        );

        let mut converters = TypeConverters::new();
        converters
            .register(FnConverter::new(
                "RoundedDouble",
                NativeType::Double,
                NativeType::BigInteger,
                |v| {
                    v.to_double()
                        .map(|d| Value::BigInteger(BigInt::from(d.round() as i64)))
                        .ok_or_else(|| ConvertError::type_mismatch(NativeType::Double, v.native_type()))
                },
                |v| {
                    v.to_double()
                        .map(Value::Double)
                        .ok_or_else(|| ConvertError::type_mismatch(NativeType::BigInteger, v.native_type()))
                },
            ))
            .unwrap();
        let rounding = AbiArgumentConverter::new(Arc::new(converters));
        assert_eq!(rounding.encode(Value::Double(1.5), &AbiType::Uint(8)).unwrap(), uint(8, 2));
    }

    #[test]
    fn test_array_shape_errors() {
        let ty = AbiType::parse("uint8[2]").unwrap();
        let err = converter().encode(Value::Int(1), &ty).unwrap_err();
        assert!(err.to_string().contains("argument is not iterable"));

        let err = converter()
            .encode(Value::List(vec![Value::Int(1)]), &ty)
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 elements, got 1"));
    }

    #[test]
    fn test_wire_values_pass_through_when_types_match() {
        let ty = AbiType::parse("uint8").unwrap();
        let wire: Value = uint(8, 7).into();
        assert_eq!(converter().encode(wire, &ty).unwrap(), uint(8, 7));

        let mismatched: Value = uint(16, 7).into();
        assert!(matches!(
            converter().encode(mismatched, &ty),
            Err(ConvertError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalars_go_through_the_registry() {
        let mut registry = TypeConverters::new();
        registry
            .register(FnConverter::new(
                "FlagText",
                NativeType::Bool,
                NativeType::String,
                |v| Ok(Value::String(v.to_string())),
                |v| Ok(Value::Bool(v.as_str() == Some("true"))),
            ))
            .unwrap();
        let converter = AbiArgumentConverter::new(Arc::new(registry));

        let encoded = converter.encode(Value::from("true"), &AbiType::Bool).unwrap();
        assert_eq!(encoded, AbiValue::Bool(true));
        let encoded = converter.encode(Value::Bool(false), &AbiType::String).unwrap();
        assert_eq!(encoded, AbiValue::String("false".to_string()));
        assert!(matches!(
            converter.encode(Value::Double(1.5), &AbiType::Address),
            Err(ConvertError::NoConverter { .. })
        ));
        assert!(converter.encode(Value::Int(-1), &AbiType::Uint(8)).is_err());
    }

    #[test]
    fn test_result_tiers() {
        let c = converter();
        assert_eq!(
            c.convert_result(&NativeType::Long, None, vec![uint(256, 42)]).unwrap(),
            Value::Long(42)
        );
        assert_eq!(
            c.convert_result(&NativeType::BigInteger, None, vec![uint(256, 42)]).unwrap(),
            Value::BigInteger(BigInt::from(42))
        );
        assert_eq!(
            c.convert_result(
                &NativeType::list(NativeType::Int),
                None,
                vec![uint(8, 1), uint(8, 2), uint(8, 1)]
            )
            .unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(1)])
        );
        assert_eq!(
            c.convert_result(&NativeType::set(NativeType::Int), None, vec![uint(8, 1), uint(8, 2), uint(8, 1)])
                .unwrap(),
            Value::Set(vec![Value::Int(1), Value::Int(2)])
        );

        let err = c
            .convert_result(&NativeType::Bool, None, vec![AbiValue::String("x".into())])
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Implicit conversion failed, unable to convert 'String' to 'bool'"));
    }

    #[test]
    fn test_result_converter_applies_to_the_whole_list() {
        let mut registry = TypeConverters::new();
        registry
            .register(FnConverter::new(
                "PairText",
                NativeType::list(NativeType::Any),
                NativeType::String,
                |v| {
                    let parts: Vec<String> = v
                        .elements()
                        .unwrap_or_default()
                        .iter()
                        .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                        .collect();
                    Ok(Value::String(parts.join(":")))
                },
                |_| Err(ConvertError::conversion_failed(NativeType::list(NativeType::Any), NativeType::String, "one way")),
            ))
            .unwrap();
        let converter = AbiArgumentConverter::new(Arc::new(registry));
        let value = converter
            .convert_result(
                &NativeType::String,
                Some("PairText"),
                vec![AbiValue::String("a".into()), AbiValue::Bool(true)],
            )
            .unwrap();
        assert_eq!(value, Value::from("a:true"));
    }
}
