use super::{ChainSchema, EventFieldOutline, EventOutline};
use crate::error::BuildError;
use crate::interface::{ContractInterface, EventTypeDescriptor, FieldSignature, MethodSignature, ParameterSignature};
use crate::metadata::{Chain, EventBinding, EventFieldBinding, EventParameterBinding};
use crate::types::NativeType;

/// Overrides for one parameter of an event subscription method.
#[derive(Debug, Clone)]
pub struct EventParameterBindingBuilder {
    index: usize,
    signature: ParameterSignature,
    special_argument: Option<String>,
}

impl EventParameterBindingBuilder {
    fn new(index: usize, signature: ParameterSignature) -> Self {
        let special_argument = signature
            .event_parameter
            .clone()
            .or_else(|| signature.special_argument.clone());
        Self {
            index,
            signature,
            special_argument,
        }
    }

    /// Tags the parameter as a special argument.
    pub fn special_argument<S: Into<String>>(&mut self, tag: S) -> &mut Self {
        self.special_argument = Some(tag.into());
        self
    }

    fn binding(&self) -> EventParameterBinding {
        EventParameterBinding {
            index: self.index,
            name: self.signature.name.clone(),
            ty: self.signature.ty.clone(),
            special_argument: self.special_argument.clone(),
        }
    }
}

/// Overrides for one field of the event payload type.
///
/// A field is sourced either by remote name or by remote position; setting one
/// clears the other.
#[derive(Debug, Clone)]
pub struct EventFieldBindingBuilder {
    signature: FieldSignature,
    source_field_name: Option<String>,
    source_field_index: Option<usize>,
    converter: Option<String>,
}

impl EventFieldBindingBuilder {
    fn new(signature: FieldSignature) -> Self {
        let config = signature.event_field.clone().unwrap_or_default();
        let (source_field_name, source_field_index) = match (config.name, config.index) {
            (_, Some(index)) => (None, Some(index)),
            (Some(name), None) => (Some(name), None),
            (None, None) => (Some(signature.name.clone()), None),
        };
        Self {
            signature,
            source_field_name,
            source_field_index,
            converter: config.converter,
        }
    }

    /// Declared field.
    pub fn signature(&self) -> &FieldSignature {
        &self.signature
    }

    /// Reads the value from the remote field called `name`.
    pub fn source_field_name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.source_field_name = Some(name.into());
        self.source_field_index = None;
        self
    }

    /// Reads the value from the remote field at `index`.
    pub fn source_field_index(&mut self, index: usize) -> &mut Self {
        self.source_field_index = Some(index);
        self.source_field_name = None;
        self
    }

    /// Sets the converter applied to the raw value.
    pub fn converter<S: Into<String>>(&mut self, converter: S) -> &mut Self {
        self.converter = Some(converter.into());
        self
    }

    fn outline(&self) -> EventFieldOutline {
        EventFieldOutline {
            field: self.signature.name.clone(),
            ty: self.signature.ty.clone(),
            source_field_name: self.source_field_name.clone(),
            source_field_index: self.source_field_index,
            converter: self.converter.clone(),
        }
    }
}

/// Builds the [`EventBinding`] of one event subscription method.
#[derive(Debug)]
pub struct EventBindingBuilder<C: Chain> {
    signature: MethodSignature,
    event_type: EventTypeDescriptor,
    event_name: String,
    parameters: Vec<EventParameterBindingBuilder>,
    fields: Vec<EventFieldBindingBuilder>,
    built: Option<EventBinding<C>>,
}

impl<C: Chain> EventBindingBuilder<C> {
    pub(crate) fn new(signature: MethodSignature, interface: &ContractInterface) -> Result<Self, BuildError> {
        if !signature.returns.observable {
            return Err(BuildError::invalid_state(format!(
                "Event method '{}' must return an event subscription",
                signature.id()
            )));
        }
        let event_type = match &signature.returns.ty {
            NativeType::Named(name) => interface.event_types.get(name).cloned(),
            _ => None,
        }
        .ok_or_else(|| {
            BuildError::invalid_argument(format!(
                "Event type '{}' of method '{}' is not declared on type '{}'",
                signature.returns.ty,
                signature.id(),
                interface.name
            ))
        })?;

        let event_name = signature
            .contract_event
            .as_ref()
            .and_then(|c| c.name.clone())
            .unwrap_or_else(|| signature.name.clone());
        let parameters = signature
            .parameters
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, parameter)| EventParameterBindingBuilder::new(index, parameter))
            .collect();
        let fields = event_type
            .fields
            .iter()
            .cloned()
            .map(EventFieldBindingBuilder::new)
            .collect();

        Ok(Self {
            signature,
            event_type,
            event_name,
            parameters,
            fields,
            built: None,
        })
    }

    /// Declared subscription method.
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Sets the remote event name.
    pub fn name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.event_name = name.into();
        self
    }

    /// The builder of the subscription parameter at `index`.
    pub fn parameter(&mut self, index: usize) -> Result<&mut EventParameterBindingBuilder, BuildError> {
        let method = self.signature.id();
        self.parameters.get_mut(index).ok_or_else(|| {
            BuildError::invalid_argument(format!(
                "Could not provide builder for parameter at position {} of event method '{}'",
                index, method
            ))
        })
    }

    /// The builder of the payload field called `name`.
    pub fn field(&mut self, name: &str) -> Result<&mut EventFieldBindingBuilder, BuildError> {
        let type_name = self.event_type.name.clone();
        self.fields
            .iter_mut()
            .find(|f| f.signature.name == name)
            .ok_or_else(|| {
                BuildError::invalid_argument(format!(
                    "Could not find field '{}' on event object of type '{}'",
                    name, type_name
                ))
            })
    }

    /// Outline of the event as configured so far.
    pub fn outline(&self) -> EventOutline {
        EventOutline {
            event_name: self.event_name.clone(),
            method: self.signature.id(),
            event_type: self.event_type.clone(),
            wrapped: self.signature.returns.wrapped,
            parameters: self.parameters.iter().map(EventParameterBindingBuilder::binding).collect(),
        }
    }

    /// Builds the event binding.
    pub fn build<S>(&mut self, schema: &S) -> Result<&EventBinding<C>, BuildError>
    where
        S: ChainSchema<C> + ?Sized,
    {
        if self.built.is_some() {
            return Err(BuildError::AlreadyBuilt);
        }

        let outline = self.outline();
        let chain = schema.event(&outline)?;
        let field_outlines: Vec<_> = self.fields.iter().map(EventFieldBindingBuilder::outline).collect();
        schema.check_event_fields(&outline, &field_outlines)?;

        let fields = field_outlines
            .into_iter()
            .map(|f| {
                Ok(EventFieldBinding {
                    chain: schema.event_field(&outline, &chain, &f)?,
                    field: f.field,
                    ty: f.ty,
                    source_field_name: f.source_field_name,
                    source_field_index: f.source_field_index,
                    converter: f.converter,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let binding = EventBinding {
            event_name: outline.event_name,
            method: outline.method,
            event_type: outline.event_type,
            wrapped: outline.wrapped,
            parameters: outline.parameters,
            fields,
            chain,
        };
        Ok(&*self.built.insert(binding))
    }

    /// Whether [`build`](Self::build) ran.
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// The built event binding.
    pub fn binding(&self) -> Result<&EventBinding<C>, BuildError> {
        self.built.as_ref().ok_or_else(|| BuildError::not_built("EventBinding"))
    }
}
