//! Builders turning a [`ContractInterface`] into a [`ContractBinding`].
//!
//! The generic builders collect everything that is chain independent (names,
//! flags, converters, special argument tags) and hand an outline of each
//! member to a [`ChainSchema`], which resolves and validates the chain
//! specific parts (ABI entries, chaincode descriptors).

mod event;
mod method;

pub use event::{EventBindingBuilder, EventFieldBindingBuilder, EventParameterBindingBuilder};
pub use method::{MethodBindingBuilder, ParameterBindingBuilder};

use crate::error::BuildError;
use crate::ids::{MethodId, ParameterId};
use crate::interface::{ContractInterface, EventTypeDescriptor};
use crate::metadata::{Chain, ContractBinding, EventParameterBinding};
use crate::types::NativeType;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Chain independent description of a parameter handed to a [`ChainSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterOutline {
    /// Parameter identifier.
    pub id: ParameterId,
    /// Declared name.
    pub name: String,
    /// Declared type.
    pub ty: NativeType,
    /// Explicit converter.
    pub converter: Option<String>,
    /// Pass-as type.
    pub pass_as: Option<NativeType>,
    /// Special argument tag.
    pub special_argument: Option<String>,
}

impl ParameterOutline {
    /// Whether the parameter is a special argument.
    pub fn is_special_argument(&self) -> bool {
        self.special_argument.is_some()
    }
}

/// Chain independent description of a method handed to a [`ChainSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOutline {
    /// Method identifier.
    pub id: MethodId,
    /// Remote method name.
    pub contract_method_name: String,
    /// Query flag.
    pub read_only: bool,
    /// Special method flag.
    pub special_method: bool,
    /// Pending handle flag.
    pub asynchronous: bool,
    /// Declared result type.
    pub result_type: NativeType,
    /// Result wrapper flag.
    pub wrapped: bool,
    /// Result converter.
    pub result_converter: Option<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterOutline>,
}

impl MethodOutline {
    /// Position of a parameter among the contract arguments.
    ///
    /// Special arguments occupy no slot in the remote signature, so every special
    /// argument declared before `parameter` shifts it one position to the left.
    pub fn contract_position(&self, parameter: &ParameterOutline) -> usize {
        let preceding_special = self
            .parameters
            .iter()
            .take_while(|p| p.id.index < parameter.id.index)
            .filter(|p| p.is_special_argument())
            .count();
        parameter.id.index - preceding_special
    }

    /// Number of contract (non special) parameters.
    pub fn contract_parameter_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.is_special_argument()).count()
    }
}

/// Chain independent description of an event handed to a [`ChainSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutline {
    /// Remote event name.
    pub event_name: String,
    /// Subscription method.
    pub method: MethodId,
    /// Payload type.
    pub event_type: EventTypeDescriptor,
    /// Event wrapper flag.
    pub wrapped: bool,
    /// Subscription parameters.
    pub parameters: Vec<EventParameterBinding>,
}

/// Chain independent description of an event field handed to a [`ChainSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFieldOutline {
    /// Target field.
    pub field: String,
    /// Declared field type.
    pub ty: NativeType,
    /// Remote field name.
    pub source_field_name: Option<String>,
    /// Remote field position.
    pub source_field_index: Option<usize>,
    /// Explicit converter.
    pub converter: Option<String>,
}

/// Resolves and validates the chain specific part of each binding.
pub trait ChainSchema<C: Chain> {
    /// Schema data for a method.
    fn method(&self, method: &MethodOutline) -> Result<C::Method, BuildError>;

    /// Schema data for a method parameter.
    fn parameter(
        &self,
        method: &MethodOutline,
        method_schema: &C::Method,
        parameter: &ParameterOutline,
    ) -> Result<C::Parameter, BuildError>;

    /// Schema data for an event.
    fn event(&self, event: &EventOutline) -> Result<C::Event, BuildError>;

    /// Schema data for an event field.
    fn event_field(
        &self,
        event: &EventOutline,
        event_schema: &C::Event,
        field: &EventFieldOutline,
    ) -> Result<C::EventField, BuildError>;

    /// Validates the set of field bindings of an event.
    fn check_event_fields(&self, _event: &EventOutline, _fields: &[EventFieldOutline]) -> Result<(), BuildError> {
        Ok(())
    }
}

/// Builds a [`ContractBinding`] for one interface.
///
/// Sub-builders are created on first request and returned again afterwards.
/// Methods and events carrying declarative defaults on the interface are
/// registered up front.
#[derive(Debug)]
pub struct ContractBindingBuilder<C: Chain> {
    interface: ContractInterface,
    identifier: Option<String>,
    methods: IndexMap<MethodId, MethodBindingBuilder<C>>,
    events: IndexMap<MethodId, EventBindingBuilder<C>>,
    built: Option<Arc<ContractBinding<C>>>,
}

impl<C: Chain> ContractBindingBuilder<C> {
    /// Creates a builder and registers all pre-configured members.
    pub fn new(interface: ContractInterface) -> Result<Self, BuildError> {
        let mut builder = Self {
            identifier: interface.identifier.clone(),
            interface,
            methods: IndexMap::new(),
            events: IndexMap::new(),
            built: None,
        };

        let configured: Vec<_> = builder
            .interface
            .methods
            .iter()
            .map(|m| (m.id(), m.contract_method.is_some(), m.contract_event.is_some()))
            .collect();
        for (id, is_method, is_event) in configured {
            if is_method {
                builder.method_by_id(&id)?;
            }
            if is_event {
                builder.event_by_id(&id)?;
            }
        }
        Ok(builder)
    }

    /// The interface being bound.
    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    /// Sets the registry identifier.
    pub fn identifier<S: Into<String>>(&mut self, identifier: S) -> &mut Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Returns the builder for a declared method, creating it on first use.
    pub fn method(&mut self, name: &str, parameter_types: &[NativeType]) -> Result<&mut MethodBindingBuilder<C>, BuildError> {
        let id = self.declared_method(name, parameter_types)?;
        self.method_by_id(&id)
    }

    /// Returns the builder for a declared method by identifier.
    pub fn method_by_id(&mut self, id: &MethodId) -> Result<&mut MethodBindingBuilder<C>, BuildError> {
        if self.events.contains_key(id) {
            return Err(BuildError::invalid_argument(format!(
                "Method '{}' is already bound as an event",
                id
            )));
        }
        if !self.methods.contains_key(id) {
            let signature = self.signature(id)?.clone();
            self.methods.insert(id.clone(), MethodBindingBuilder::new(signature));
        }
        self.methods
            .get_mut(id)
            .ok_or_else(|| BuildError::invalid_argument(format!("Could not provide builder for method '{}'", id)))
    }

    /// Returns the builder for a declared event subscription method, creating it on first use.
    pub fn event(&mut self, name: &str, parameter_types: &[NativeType]) -> Result<&mut EventBindingBuilder<C>, BuildError> {
        let id = self.declared_method(name, parameter_types)?;
        self.event_by_id(&id)
    }

    /// Returns the builder for a declared event subscription method by identifier.
    pub fn event_by_id(&mut self, id: &MethodId) -> Result<&mut EventBindingBuilder<C>, BuildError> {
        if self.methods.contains_key(id) {
            return Err(BuildError::invalid_argument(format!(
                "Method '{}' is already bound as a contract method",
                id
            )));
        }
        if !self.events.contains_key(id) {
            let signature = self.signature(id)?.clone();
            let builder = EventBindingBuilder::new(signature, &self.interface)?;
            self.events.insert(id.clone(), builder);
        }
        self.events
            .get_mut(id)
            .ok_or_else(|| BuildError::invalid_argument(format!("Could not provide builder for event '{}'", id)))
    }

    /// Registered method builders.
    pub fn method_builders(&self) -> impl Iterator<Item = &MethodBindingBuilder<C>> {
        self.methods.values()
    }

    /// Registered event builders.
    pub fn event_builders(&self) -> impl Iterator<Item = &EventBindingBuilder<C>> {
        self.events.values()
    }

    /// Builds the contract binding, building every sub-builder that has not been built yet.
    pub fn build<S>(&mut self, schema: &S, chain: C::Contract) -> Result<Arc<ContractBinding<C>>, BuildError>
    where
        S: ChainSchema<C> + ?Sized,
    {
        if self.built.is_some() {
            return Err(BuildError::AlreadyBuilt);
        }

        let mut methods = IndexMap::with_capacity(self.methods.len());
        for (id, builder) in self.methods.iter_mut() {
            if !builder.is_built() {
                builder.build(schema)?;
            }
            methods.insert(id.clone(), builder.binding()?.clone());
        }

        let mut events = IndexMap::with_capacity(self.events.len());
        for builder in self.events.values_mut() {
            if !builder.is_built() {
                builder.build(schema)?;
            }
            let binding = builder.binding()?.clone();
            if events.contains_key(binding.event_name()) {
                return Err(BuildError::invalid_state(format!(
                    "Event '{}' is bound by more than one method",
                    binding.event_name()
                )));
            }
            events.insert(binding.event_name().to_string(), binding);
        }

        let identifier = self
            .identifier
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        debug!(
            "Built {} binding '{}' for '{}' ({} methods, {} events)",
            C::NAME,
            identifier,
            self.interface.name,
            methods.len(),
            events.len()
        );

        let binding = Arc::new(ContractBinding {
            identifier,
            interface: self.interface.name.clone(),
            methods,
            events,
            chain,
        });
        self.built = Some(Arc::clone(&binding));
        Ok(binding)
    }

    /// Whether [`build`](Self::build) ran.
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// The built contract binding.
    pub fn binding(&self) -> Result<Arc<ContractBinding<C>>, BuildError> {
        self.built
            .clone()
            .ok_or_else(|| BuildError::not_built("ContractBinding"))
    }

    fn declared_method(&self, name: &str, parameter_types: &[NativeType]) -> Result<MethodId, BuildError> {
        self.interface
            .find_method(name, parameter_types)
            .map(|m| m.id())
            .ok_or_else(|| {
                BuildError::invalid_argument(format!(
                    "Could not find method '{}' on type '{}'",
                    MethodId::new(name, parameter_types),
                    self.interface.name
                ))
            })
    }

    fn signature(&self, id: &MethodId) -> Result<&crate::interface::MethodSignature, BuildError> {
        self.interface.method_by_id(id).ok_or_else(|| {
            BuildError::invalid_argument(format!(
                "Could not find method '{}' on type '{}'",
                id, self.interface.name
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interface::{
        ContractMethodConfig, EventFieldConfig, FieldSignature, MethodSignature, ParameterSignature, ReturnSignature,
    };
    use serde::{Deserialize, Serialize};

    /// Chain whose parameter data records the contract position.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Positional;

    impl Chain for Positional {
        const NAME: &'static str = "positional";
        type Contract = ();
        type Method = String;
        type Parameter = Option<usize>;
        type Event = String;
        type EventField = String;
    }

    pub(crate) struct PositionalSchema;

    impl ChainSchema<Positional> for PositionalSchema {
        fn method(&self, method: &MethodOutline) -> Result<String, BuildError> {
            Ok(method.contract_method_name.clone())
        }

        fn parameter(&self, method: &MethodOutline, _: &String, parameter: &ParameterOutline) -> Result<Option<usize>, BuildError> {
            Ok((!parameter.is_special_argument()).then(|| method.contract_position(parameter)))
        }

        fn event(&self, event: &EventOutline) -> Result<String, BuildError> {
            Ok(event.event_name.clone())
        }

        fn event_field(&self, _: &EventOutline, _: &String, field: &EventFieldOutline) -> Result<String, BuildError> {
            Ok(field
                .source_field_name
                .clone()
                .or_else(|| field.source_field_index.map(|i| i.to_string()))
                .unwrap_or_default())
        }
    }

    pub(crate) fn greeter() -> ContractInterface {
        ContractInterface::new("Greeter")
            .method(
                MethodSignature::new(
                    "greet",
                    vec![
                        ParameterSignature::new("gasPrice", NativeType::BigInteger).special("gasPrice"),
                        ParameterSignature::new("name", NativeType::String),
                        ParameterSignature::new("gasLimit", NativeType::BigInteger).special("gasLimit"),
                        ParameterSignature::new("times", NativeType::Int),
                    ],
                    ReturnSignature::of(NativeType::String),
                )
                .contract_method(ContractMethodConfig {
                    name: Some("sayHello".to_string()),
                    ..Default::default()
                }),
            )
            .method(MethodSignature::new(
                "greeting",
                vec![],
                ReturnSignature::of(NativeType::String).asynchronous(),
            ))
            .method(MethodSignature::new(
                "onGreeting",
                vec![ParameterSignature::new("from", NativeType::Long).event_parameter("fromBlock")],
                ReturnSignature::events("Greeted").wrapped(),
            ))
            .event_type(EventTypeDescriptor::new(
                "Greeted",
                vec![
                    FieldSignature::new("who", NativeType::String).with_config(EventFieldConfig {
                        name: Some("name".to_string()),
                        ..Default::default()
                    }),
                    FieldSignature::new("count", NativeType::Int),
                ],
            ))
    }

    #[test]
    fn test_configured_methods_are_registered_up_front() {
        let builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        let names: Vec<_> = builder.method_builders().map(|m| m.signature().name.clone()).collect();
        assert_eq!(names, vec!["greet".to_string()]);
    }

    #[test]
    fn test_special_arguments_shift_contract_positions() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        let binding = builder.build(&PositionalSchema, ()).unwrap();
        let greet = binding
            .method(&MethodId::new(
                "greet",
                &[NativeType::BigInteger, NativeType::String, NativeType::BigInteger, NativeType::Int],
            ))
            .unwrap();
        let positions: Vec<_> = greet.parameters().iter().map(|p| *p.chain()).collect();
        assert_eq!(positions, vec![None, Some(0), None, Some(1)]);
        assert_eq!(greet.contract_method_name(), "sayHello");
    }

    #[test]
    fn test_build_twice_and_access_before_build_fail() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        assert_eq!(builder.binding().unwrap_err(), BuildError::not_built("ContractBinding"));
        builder.build(&PositionalSchema, ()).unwrap();
        assert_eq!(builder.build(&PositionalSchema, ()).unwrap_err(), BuildError::AlreadyBuilt);

        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        let method = builder.method("greeting", &[]).unwrap();
        assert!(method.binding().is_err());
        method.build(&PositionalSchema).unwrap();
        assert_eq!(method.build(&PositionalSchema).unwrap_err(), BuildError::AlreadyBuilt);
    }

    #[test]
    fn test_unknown_members_are_rejected() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        let err = builder.method("greet", &[NativeType::String]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument { .. }));
        assert!(err.to_string().contains("greet(String)"));

        let method = builder.method("greeting", &[]).unwrap();
        assert!(method.parameter(0).is_err());

        let event = builder.event("onGreeting", &[NativeType::Long]).unwrap();
        assert!(event.field("missing").is_err());
    }

    #[test]
    fn test_member_is_bound_at_most_once() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        builder.event("onGreeting", &[NativeType::Long]).unwrap();
        assert!(builder.method("onGreeting", &[NativeType::Long]).is_err());
    }

    #[test]
    fn test_event_binding_defaults() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        builder.event("onGreeting", &[NativeType::Long]).unwrap();
        builder.identifier("greeter-1");
        let binding = builder.build(&PositionalSchema, ()).unwrap();

        assert_eq!(binding.identifier(), "greeter-1");
        let event = binding.event("onGreeting").unwrap();
        assert!(event.uses_event_wrapper());
        assert_eq!(event.parameters()[0].special_argument(), Some("fromBlock"));
        let sources: Vec<_> = event.fields().iter().map(|f| f.chain().clone()).collect();
        assert_eq!(sources, vec!["name".to_string(), "count".to_string()]);
    }

    #[test]
    fn test_random_identifier_when_unset() {
        let mut builder = ContractBindingBuilder::<Positional>::new(greeter()).unwrap();
        let binding = builder.build(&PositionalSchema, ()).unwrap();
        assert_eq!(binding.identifier().len(), 32);
        assert!(!binding.identifier().contains('-'));
    }
}
