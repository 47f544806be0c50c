//! Declared contract interfaces.
//!
//! A [`ContractInterface`] lists the methods an application wants to call on a
//! contract together with the event payload types those methods subscribe to.
//! Optional configuration structs attached to methods, parameters and fields
//! carry the same defaults a builder would otherwise have to be told about.

use crate::ids::MethodId;
use crate::types::NativeType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Method-level defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMethodConfig {
    /// Remote method name, defaults to the declared name.
    pub name: Option<String>,
    /// Issue the call as a query.
    pub read_only: bool,
    /// Route the call to a chain specific operation such as deployment.
    pub special_method: bool,
    /// Converter applied to the result.
    pub converter: Option<String>,
}

/// Parameter-level defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParameterConfig {
    /// Converter applied to the argument.
    pub converter: Option<String>,
    /// Intermediate type the argument is passed as.
    pub pass_as: Option<NativeType>,
}

/// Event-level defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventConfig {
    /// Remote event name, defaults to the declared method name.
    pub name: Option<String>,
}

/// Event field defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFieldConfig {
    /// Name of the remote field the value is read from.
    pub name: Option<String>,
    /// Position of the remote field the value is read from.
    pub index: Option<usize>,
    /// Converter applied to the raw value.
    pub converter: Option<String>,
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSignature {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: NativeType,
    /// Conversion defaults.
    pub contract_parameter: Option<ContractParameterConfig>,
    /// Special argument tag.
    pub special_argument: Option<String>,
    /// Special argument tag used when the method subscribes to an event.
    pub event_parameter: Option<String>,
}

impl ParameterSignature {
    /// A plain parameter.
    pub fn new<S: Into<String>>(name: S, ty: NativeType) -> Self {
        Self {
            name: name.into(),
            ty,
            contract_parameter: None,
            special_argument: None,
            event_parameter: None,
        }
    }

    /// Marks the parameter as a special argument.
    pub fn special<S: Into<String>>(mut self, tag: S) -> Self {
        self.special_argument = Some(tag.into());
        self
    }

    /// Marks the parameter as an event subscription argument.
    pub fn event_parameter<S: Into<String>>(mut self, tag: S) -> Self {
        self.event_parameter = Some(tag.into());
        self
    }

    /// Attaches conversion defaults.
    pub fn with_config(mut self, config: ContractParameterConfig) -> Self {
        self.contract_parameter = Some(config);
        self
    }
}

/// How a method hands back its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSignature {
    /// Value type, or the event payload type for event methods.
    pub ty: NativeType,
    /// The method returns a pending handle instead of waiting.
    pub asynchronous: bool,
    /// The value is wrapped together with block and transaction hashes.
    pub wrapped: bool,
    /// The method returns an event subscription.
    pub observable: bool,
}

impl ReturnSignature {
    /// A plain synchronous return.
    pub fn of(ty: NativeType) -> Self {
        Self {
            ty,
            asynchronous: false,
            wrapped: false,
            observable: false,
        }
    }

    /// No return value.
    pub fn void() -> Self {
        Self::of(NativeType::Void)
    }

    /// An event subscription yielding objects of `event_type`.
    pub fn events<S: Into<String>>(event_type: S) -> Self {
        Self {
            ty: NativeType::Named(event_type.into()),
            asynchronous: false,
            wrapped: false,
            observable: true,
        }
    }

    /// Returns a pending handle.
    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    /// Wraps the value with block and transaction hashes.
    pub fn wrapped(mut self) -> Self {
        self.wrapped = true;
        self
    }

    /// Whether nothing is returned.
    pub fn is_void(&self) -> bool {
        self.ty == NativeType::Void
    }
}

/// A declared interface method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Declared name.
    pub name: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterSignature>,
    /// Return shape.
    pub returns: ReturnSignature,
    /// Method defaults; methods carrying them are registered automatically.
    pub contract_method: Option<ContractMethodConfig>,
    /// Event defaults; methods carrying them are registered as events automatically.
    pub contract_event: Option<ContractEventConfig>,
}

impl MethodSignature {
    /// A method without defaults.
    pub fn new<S: Into<String>>(name: S, parameters: Vec<ParameterSignature>, returns: ReturnSignature) -> Self {
        Self {
            name: name.into(),
            parameters,
            returns,
            contract_method: None,
            contract_event: None,
        }
    }

    /// Attaches method defaults.
    pub fn contract_method(mut self, config: ContractMethodConfig) -> Self {
        self.contract_method = Some(config);
        self
    }

    /// Attaches event defaults.
    pub fn contract_event(mut self, config: ContractEventConfig) -> Self {
        self.contract_event = Some(config);
        self
    }

    /// Declared parameter types.
    pub fn parameter_types(&self) -> Vec<NativeType> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    /// Stable identifier of the method.
    pub fn id(&self) -> MethodId {
        MethodId::new(&self.name, &self.parameter_types())
    }
}

/// A declared field of an event payload type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSignature {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: NativeType,
    /// Source defaults.
    pub event_field: Option<EventFieldConfig>,
}

impl FieldSignature {
    /// A field without defaults.
    pub fn new<S: Into<String>>(name: S, ty: NativeType) -> Self {
        Self {
            name: name.into(),
            ty,
            event_field: None,
        }
    }

    /// Attaches source defaults.
    pub fn with_config(mut self, config: EventFieldConfig) -> Self {
        self.event_field = Some(config);
        self
    }
}

/// An event payload type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeDescriptor {
    /// Type name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldSignature>,
}

impl EventTypeDescriptor {
    /// Creates a payload type.
    pub fn new<S: Into<String>>(name: S, fields: Vec<FieldSignature>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSignature> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A contract interface: methods plus the event payload types they use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInterface {
    /// Interface name.
    pub name: String,
    /// Default binding identifier.
    pub identifier: Option<String>,
    /// Declared methods.
    pub methods: Vec<MethodSignature>,
    /// Event payload types keyed by name.
    pub event_types: IndexMap<String, EventTypeDescriptor>,
}

impl ContractInterface {
    /// Creates an empty interface.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            methods: Vec::new(),
            event_types: IndexMap::new(),
        }
    }

    /// Sets the default identifier.
    pub fn identifier<S: Into<String>>(mut self, identifier: S) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Declares a method.
    pub fn method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    /// Declares an event payload type.
    pub fn event_type(mut self, event_type: EventTypeDescriptor) -> Self {
        self.event_types.insert(event_type.name.clone(), event_type);
        self
    }

    /// Finds a method by name and parameter types.
    pub fn find_method(&self, name: &str, parameter_types: &[NativeType]) -> Option<&MethodSignature> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters.iter().map(|p| &p.ty).eq(parameter_types.iter()))
    }

    /// Finds a method by identifier.
    pub fn method_by_id(&self, id: &MethodId) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.id() == *id)
    }
}
