use super::{Chain, SpecialArguments};
use crate::ids::MethodId;
use crate::interface::EventTypeDescriptor;
use crate::types::NativeType;
use serde::{Deserialize, Serialize};

/// A parameter of an event subscription method.
///
/// Subscription parameters never reach the contract; they only carry special
/// arguments such as block ranges or target peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParameterBinding {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) ty: NativeType,
    pub(crate) special_argument: Option<String>,
}

impl EventParameterBinding {
    /// Zero based position within the subscription method.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> &NativeType {
        &self.ty
    }

    /// Special argument tag.
    pub fn special_argument(&self) -> Option<&str> {
        self.special_argument.as_deref()
    }
}

/// Maps one field of the event payload type onto a remote event field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EventFieldBinding<C: Chain> {
    pub(crate) field: String,
    pub(crate) ty: NativeType,
    pub(crate) source_field_name: Option<String>,
    pub(crate) source_field_index: Option<usize>,
    pub(crate) converter: Option<String>,
    pub(crate) chain: C::EventField,
}

impl<C: Chain> EventFieldBinding<C> {
    /// Target field on the payload type.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Declared type of the target field.
    pub fn ty(&self) -> &NativeType {
        &self.ty
    }

    /// Remote field name.
    pub fn source_field_name(&self) -> Option<&str> {
        self.source_field_name.as_deref()
    }

    /// Remote field position; takes precedence over the name.
    pub fn source_field_index(&self) -> Option<usize> {
        self.source_field_index
    }

    /// Explicit converter.
    pub fn converter(&self) -> Option<&str> {
        self.converter.as_deref()
    }

    /// Chain specific data.
    pub fn chain(&self) -> &C::EventField {
        &self.chain
    }
}

/// Binding of one contract event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EventBinding<C: Chain> {
    pub(crate) event_name: String,
    pub(crate) method: MethodId,
    pub(crate) event_type: EventTypeDescriptor,
    pub(crate) wrapped: bool,
    pub(crate) parameters: Vec<EventParameterBinding>,
    pub(crate) fields: Vec<EventFieldBinding<C>>,
    pub(crate) chain: C::Event,
}

impl<C: Chain> EventBinding<C> {
    /// Remote event name.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The subscription method.
    pub fn method(&self) -> &MethodId {
        &self.method
    }

    /// Payload type events are materialized as.
    pub fn event_type(&self) -> &EventTypeDescriptor {
        &self.event_type
    }

    /// Whether emitted values carry block and transaction hashes.
    pub fn uses_event_wrapper(&self) -> bool {
        self.wrapped
    }

    /// Subscription parameters in declaration order.
    pub fn parameters(&self) -> &[EventParameterBinding] {
        &self.parameters
    }

    /// Field bindings.
    pub fn fields(&self) -> &[EventFieldBinding<C>] {
        &self.fields
    }

    /// Chain specific data.
    pub fn chain(&self) -> &C::Event {
        &self.chain
    }
}

impl<C: Chain> SpecialArguments for EventBinding<C> {
    fn special_tags(&self) -> Vec<Option<&str>> {
        self.parameters.iter().map(EventParameterBinding::special_argument).collect()
    }
}
