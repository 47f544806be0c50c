//! Registry of type converters and the conversion precedence chain.

use super::converter::TypeConverter;
use crate::error::ConvertError;
use crate::types::{NativeType, TypedValue, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which side of a converter a conversion runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `source -> target`
    Forward,
    /// `target -> source`
    Backward,
}

/// A converter together with the direction it has to be applied in.
#[derive(Clone)]
pub struct ConversionFn {
    converter: Arc<dyn TypeConverter>,
    direction: Direction,
}

impl ConversionFn {
    /// The underlying converter.
    pub fn converter(&self) -> &Arc<dyn TypeConverter> {
        &self.converter
    }

    /// Direction the converter is applied in.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Type produced by this conversion.
    pub fn output_type(&self) -> &NativeType {
        match self.direction {
            Direction::Forward => self.converter.target_type(),
            Direction::Backward => self.converter.source_type(),
        }
    }

    /// Applies the conversion.
    pub fn apply(&self, value: Value) -> Result<Value, ConvertError> {
        match self.direction {
            Direction::Forward => self.converter.to_target(value),
            Direction::Backward => self.converter.to_source(value),
        }
    }
}

impl fmt::Debug for ConversionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionFn")
            .field("converter", &self.converter.name())
            .field("direction", &self.direction)
            .finish()
    }
}

/// Per-value overrides taken from a parameter, field or method binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionHints<'a> {
    /// Name of an explicitly requested converter.
    pub converter: Option<&'a str>,
    /// Intermediate type the value should be passed as.
    pub pass_as: Option<&'a NativeType>,
    /// Keep the original value when no converter for `pass_as` exists.
    pub lenient: bool,
}

impl<'a> ConversionHints<'a> {
    /// Hints carrying only an explicit converter.
    pub fn converter(converter: Option<&'a str>) -> Self {
        Self {
            converter,
            ..Self::default()
        }
    }
}

/// Holds the registered converters and resolves conversions between native types.
///
/// Converters are looked up by name, or by their `(source, target)` pair in
/// either orientation. Registering a second converter under an existing name or
/// for an already covered type pair is rejected, so exact pair lookups are never
/// ambiguous. When only assignable (not exact) pairs match, the earliest
/// registered converter wins.
#[derive(Clone, Default)]
pub struct TypeConverters {
    converters: Vec<Arc<dyn TypeConverter>>,
    by_name: HashMap<String, usize>,
    by_pair: HashMap<(NativeType, NativeType), usize>,
}

impl TypeConverters {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter.
    pub fn register<T: TypeConverter + 'static>(&mut self, converter: T) -> Result<&mut Self, ConvertError> {
        self.register_arc(Arc::new(converter))
    }

    /// Registers a shared converter.
    pub fn register_arc(&mut self, converter: Arc<dyn TypeConverter>) -> Result<&mut Self, ConvertError> {
        let name = converter.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ConvertError::DuplicateConverter {
                message: format!("a converter named '{}' is already registered", name),
            });
        }
        let source = converter.source_type().clone();
        let target = converter.target_type().clone();
        let forward = (source.clone(), target.clone());
        let backward = (target.clone(), source.clone());
        if let Some(existing) = self.by_pair.get(&forward).or_else(|| self.by_pair.get(&backward)) {
            return Err(ConvertError::DuplicateConverter {
                message: format!(
                    "'{}' covers {} <-> {} which '{}' already handles",
                    name,
                    source,
                    target,
                    self.converters[*existing].name()
                ),
            });
        }

        let index = self.converters.len();
        debug!("Registering type converter '{}' ({} <-> {})", name, source, target);
        self.converters.push(converter);
        self.by_name.insert(name, index);
        self.by_pair.insert(forward, index);
        Ok(self)
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Registered converters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TypeConverter>> {
        self.converters.iter()
    }

    /// Looks up a converter by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TypeConverter>> {
        self.by_name.get(name).map(|i| &self.converters[*i])
    }

    /// Finds a conversion from `source` into `target`.
    ///
    /// Exact pairs are preferred over assignable ones and forward application
    /// over backward application.
    pub fn conversion_function(&self, source: &NativeType, target: &NativeType) -> Option<ConversionFn> {
        let exact = |direction: Direction| {
            let key = match direction {
                Direction::Forward => (source.clone(), target.clone()),
                Direction::Backward => (target.clone(), source.clone()),
            };
            self.by_pair.get(&key).map(|i| ConversionFn {
                converter: Arc::clone(&self.converters[*i]),
                direction,
            })
        };
        let assignable = |direction: Direction| {
            self.converters
                .iter()
                .find(|c| {
                    let (input, output) = match direction {
                        Direction::Forward => (c.source_type(), c.target_type()),
                        Direction::Backward => (c.target_type(), c.source_type()),
                    };
                    input.is_assignable_from(source) && target.is_assignable_from(output)
                })
                .map(|c| ConversionFn {
                    converter: Arc::clone(c),
                    direction,
                })
        };

        exact(Direction::Forward)
            .or_else(|| exact(Direction::Backward))
            .or_else(|| assignable(Direction::Forward))
            .or_else(|| assignable(Direction::Backward))
    }

    /// Converts using a named converter, choosing the direction from the value's type.
    ///
    /// With `strict` unset an unsuitable converter yields `Ok(None)`.
    pub fn convert_with(
        &self,
        name: &str,
        value: Value,
        source: &NativeType,
        strict: bool,
    ) -> Result<Option<TypedValue>, ConvertError> {
        let converter = self
            .get(name)
            .ok_or_else(|| ConvertError::UnknownConverter { name: name.to_string() })?;

        let direction = if converter.source_type().is_assignable_from(source) || value.is_instance_of(converter.source_type()) {
            Direction::Forward
        } else if converter.target_type().is_assignable_from(source) || value.is_instance_of(converter.target_type()) {
            Direction::Backward
        } else if strict {
            return Err(ConvertError::UnsuitableConverter {
                name: name.to_string(),
                declared: format!("{} <-> {}", converter.source_type(), converter.target_type()),
                actual: source.to_string(),
            });
        } else {
            return Ok(None);
        };

        let function = ConversionFn {
            converter: Arc::clone(converter),
            direction,
        };
        let ty = function.output_type().clone();
        Ok(Some(TypedValue::new(ty, function.apply(value)?)))
    }

    /// Converts using the first matching converter; `Ok(None)` when none matches.
    pub fn convert_matching(
        &self,
        value: Value,
        source: &NativeType,
        target: &NativeType,
    ) -> Result<Option<Value>, ConvertError> {
        let runtime = value.native_type();
        let function = self
            .conversion_function(source, target)
            .or_else(|| (runtime != *source).then(|| self.conversion_function(&runtime, target)).flatten());
        match function {
            Some(function) => function.apply(value).map(Some),
            None => Ok(None),
        }
    }

    /// Applies the explicit converter or pass-as hint to a value.
    ///
    /// Values without hints are returned unchanged, paired with `declared`.
    pub fn prepare(
        &self,
        value: Value,
        declared: &NativeType,
        hints: ConversionHints<'_>,
    ) -> Result<TypedValue, ConvertError> {
        if let Some(name) = hints.converter {
            if hints.pass_as.is_some() {
                warn!("Both converter '{}' and pass-as type are given, pass-as type is ignored", name);
            }
            return self
                .convert_with(name, value, declared, true)?
                .ok_or_else(|| ConvertError::no_converter(name, declared));
        }

        if let Some(pass_as) = hints.pass_as {
            if pass_as.is_assignable_from(declared) {
                return Ok(TypedValue::new(pass_as.clone(), value));
            }
            let runtime = value.native_type();
            match self.convert_matching(value.clone(), declared, pass_as)? {
                Some(converted) => return Ok(TypedValue::new(pass_as.clone(), converted)),
                None if hints.lenient => {
                    debug!("No converter from '{}' to pass-as type '{}', keeping value", declared, pass_as);
                }
                None => return Err(ConvertError::no_converter(pass_as, runtime)),
            }
        }

        Ok(TypedValue::new(declared.clone(), value))
    }

    /// Resolves `value` (declared as `declared`) into `target`.
    ///
    /// Precedence: explicit converter, pass-as type, identity, registry search.
    /// A value that still does not fit `target` is reported as an error.
    pub fn resolve(
        &self,
        value: Value,
        declared: &NativeType,
        target: &NativeType,
        hints: ConversionHints<'_>,
    ) -> Result<Value, ConvertError> {
        if let Some(name) = hints.converter {
            let converted = self
                .convert_with(name, value, declared, true)?
                .ok_or_else(|| ConvertError::no_converter(target, declared))?;
            return check_instance(converted.value, target);
        }

        if hints.pass_as.is_some() {
            let prepared = self.prepare(value.clone(), declared, hints)?;
            if prepared.ty != *declared || prepared.value != value {
                return Ok(prepared.value);
            }
        }

        if target.is_assignable_from(declared) || value.is_instance_of(target) {
            return Ok(value);
        }

        let actual = value.native_type();
        match self.convert_matching(value, declared, target)? {
            Some(converted) => check_instance(converted, target),
            None => Err(ConvertError::no_converter(target, actual)),
        }
    }
}

impl fmt::Debug for TypeConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.converters.iter().map(|c| c.name())).finish()
    }
}

/// Fails unless `value` fits the declared type.
pub fn check_instance(value: Value, declared: &NativeType) -> Result<Value, ConvertError> {
    if value.is_instance_of(declared) {
        Ok(value)
    } else {
        Err(ConvertError::type_mismatch(declared, value.native_type()))
    }
}
