//! Resolution of bindings against a contract ABI.

use crate::abi::{AbiDefinition, AbiEntryKind, AbiType, NamedType};
use crate::metadata::{AbiChain, AbiEvent, AbiEventField, AbiMethod, AbiParameter};
use crate::special::DEPLOYMENT_METHOD;
use chainbind_core::builder::{EventFieldOutline, EventOutline, MethodOutline, ParameterOutline};
use chainbind_core::{BuildError, ChainSchema, NativeType};

/// A contract ABI used as the schema of ABI chain bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiSchema {
    definitions: Vec<AbiDefinition>,
}

impl AbiSchema {
    /// Wraps a parsed ABI.
    pub fn new(definitions: Vec<AbiDefinition>) -> Self {
        Self { definitions }
    }

    /// The ABI entries.
    pub fn definitions(&self) -> &[AbiDefinition] {
        &self.definitions
    }

    fn find(&self, kind: AbiEntryKind, name: &str) -> Option<&AbiDefinition> {
        self.definitions.iter().find(|d| d.matches(kind, name))
    }

    fn constructor(&self) -> Option<&AbiDefinition> {
        self.definitions.iter().find(|d| d.kind == AbiEntryKind::Constructor)
    }
}

fn is_deployment(method: &MethodOutline) -> bool {
    method.special_method && method.contract_method_name.eq_ignore_ascii_case(DEPLOYMENT_METHOD)
}

fn checked_type<'a>(input: &'a NamedType, owner: &str) -> Result<&'a str, BuildError> {
    let ty = input.solidity_type();
    AbiType::parse(ty)
        .map_err(|e| BuildError::invalid_state(format!("Invalid ABI type of '{}' in '{}': {}", input.name, owner, e)))?;
    Ok(ty)
}

impl<C: AbiChain> ChainSchema<C> for AbiSchema {
    fn method(&self, method: &MethodOutline) -> Result<AbiMethod, BuildError> {
        if method.special_method {
            if !is_deployment(method) {
                return Ok(AbiMethod { abi: None });
            }
            if !matches!(method.result_type, NativeType::Void | NativeType::String) {
                return Err(BuildError::invalid_state(format!(
                    "Unexpected return type of deployment method '{}'. The deployment method must either return String or nothing, optionally asynchronous or wrapped in a call result.",
                    method.id
                )));
            }
            return Ok(AbiMethod {
                abi: self.constructor().cloned(),
            });
        }

        let abi = self
            .find(AbiEntryKind::Function, &method.contract_method_name)
            .ok_or_else(|| {
                BuildError::missing_schema(
                    "ABI definition",
                    format!("Could not find ABI definition for method '{}'", method.contract_method_name),
                )
            })?;
        for output in &abi.outputs {
            checked_type(output, abi.name())?;
        }
        Ok(AbiMethod { abi: Some(abi.clone()) })
    }

    fn parameter(
        &self,
        method: &MethodOutline,
        method_schema: &AbiMethod,
        parameter: &ParameterOutline,
    ) -> Result<AbiParameter, BuildError> {
        if parameter.is_special_argument() || (method.special_method && !is_deployment(method)) {
            return Ok(AbiParameter { solidity_type: None });
        }

        let inputs = method_schema
            .abi
            .as_ref()
            .map(|abi| abi.inputs.as_slice())
            .unwrap_or_default();
        let input = inputs
            .get(method.contract_position(parameter))
            .ok_or_else(|| BuildError::invalid_state("ABI definition defines too few input parameters."))?;
        let ty = checked_type(input, &method.contract_method_name)?;
        Ok(AbiParameter {
            solidity_type: Some(ty.to_string()),
        })
    }

    fn event(&self, event: &EventOutline) -> Result<AbiEvent, BuildError> {
        let abi = self.find(AbiEntryKind::Event, &event.event_name).ok_or_else(|| {
            BuildError::missing_schema(
                "ABI definition",
                format!("Could not find ABI definition for event '{}'", event.event_name),
            )
        })?;

        if let Some(parameter) = event.parameters.iter().find(|p| p.special_argument().is_none()) {
            return Err(BuildError::invalid_state(format!(
                "Argument name for parameter {} ({}) of event method '{}' is not set.",
                parameter.index(),
                parameter.name(),
                event.method
            )));
        }
        Ok(AbiEvent { abi: abi.clone() })
    }

    fn event_field(
        &self,
        event: &EventOutline,
        event_schema: &AbiEvent,
        field: &EventFieldOutline,
    ) -> Result<AbiEventField, BuildError> {
        let inputs = &event_schema.abi.inputs;
        let position = match (field.source_field_index, field.source_field_name.as_deref()) {
            (Some(index), _) => (index < inputs.len()).then_some(index),
            (None, Some(name)) => inputs.iter().position(|i| i.name.eq_ignore_ascii_case(name)),
            (None, None) => None,
        };
        let position = position.ok_or_else(|| {
            BuildError::invalid_state(format!(
                "Could not find ABI type definition for event field '{}'. Specified name: '{}', index: '{}'",
                field.field,
                field.source_field_name.as_deref().unwrap_or_default(),
                field.source_field_index.map(|i| i.to_string()).unwrap_or_default()
            ))
        })?;

        let input = &inputs[position];
        let solidity_type = checked_type(input, &event.event_name)?.to_string();
        let slot = inputs[..position].iter().filter(|i| i.indexed == input.indexed).count();
        Ok(AbiEventField {
            name: input.name.clone(),
            solidity_type,
            indexed: input.indexed,
            slot,
        })
    }
}
