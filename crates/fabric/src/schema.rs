//! Validation of bindings against the chaincode calling conventions.
//!
//! Chaincode functions take and return plain strings, so there is no remote
//! descriptor to look members up in. The schema only classifies methods and
//! enforces the shape of special methods and events.

use crate::metadata::{Fabric, FabricEvent, FabricEventField, FabricMethod, FabricMethodKind, FabricParameter};
use crate::special::{INSTALL_METHOD, INSTANTIATE_METHOD};
use chainbind_core::builder::{EventFieldOutline, EventOutline, MethodOutline, ParameterOutline};
use chainbind_core::{BuildError, ChainSchema, NativeType};
use tracing::warn;

/// The chaincode schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaincodeSchema;

fn special_kind(method: &MethodOutline) -> Result<FabricMethodKind, BuildError> {
    let name = &method.contract_method_name;
    let kind = if name.eq_ignore_ascii_case(INSTALL_METHOD) {
        FabricMethodKind::Install
    } else if name.eq_ignore_ascii_case(INSTANTIATE_METHOD) {
        FabricMethodKind::Instantiate
    } else {
        return Err(BuildError::invalid_state(format!(
            "Unknown special method '{}' of '{}', Hyperledger Fabric supports '{}' and '{}'",
            name, method.id, INSTALL_METHOD, INSTANTIATE_METHOD
        )));
    };
    if method.result_type != NativeType::Void {
        return Err(BuildError::invalid_state(format!(
            "Unexpected return type of {} method '{}'. The method must not return a value, optionally asynchronous.",
            name, method.id
        )));
    }
    Ok(kind)
}

impl ChainSchema<Fabric> for ChaincodeSchema {
    fn method(&self, method: &MethodOutline) -> Result<FabricMethod, BuildError> {
        let kind = if method.special_method {
            special_kind(method)?
        } else if method.read_only {
            FabricMethodKind::Query
        } else {
            FabricMethodKind::Invoke
        };
        Ok(FabricMethod { kind })
    }

    fn parameter(
        &self,
        method: &MethodOutline,
        method_schema: &FabricMethod,
        parameter: &ParameterOutline,
    ) -> Result<FabricParameter, BuildError> {
        if parameter.is_special_argument() || method_schema.kind == FabricMethodKind::Install {
            return Ok(FabricParameter { position: None });
        }
        Ok(FabricParameter {
            position: Some(method.contract_position(parameter)),
        })
    }

    fn event(&self, event: &EventOutline) -> Result<FabricEvent, BuildError> {
        if let Some(parameter) = event.parameters.iter().find(|p| p.special_argument().is_none()) {
            return Err(BuildError::invalid_state(format!(
                "Argument name for parameter {} ({}) of event method '{}' is not set.",
                parameter.index(),
                parameter.name(),
                event.method
            )));
        }
        let payload_field = event
            .event_type
            .fields
            .first()
            .map(|field| field.name.clone())
            .unwrap_or_default();
        Ok(FabricEvent { payload_field })
    }

    fn event_field(
        &self,
        _event: &EventOutline,
        event_schema: &FabricEvent,
        field: &EventFieldOutline,
    ) -> Result<FabricEventField, BuildError> {
        Ok(FabricEventField {
            from_payload: field.field == event_schema.payload_field,
        })
    }

    fn check_event_fields(&self, event: &EventOutline, fields: &[EventFieldOutline]) -> Result<(), BuildError> {
        match fields {
            [] => Err(BuildError::invalid_state(format!(
                "Cannot bind event '{}', its type '{}' has no field to receive the chaincode event payload",
                event.event_name, event.event_type.name
            ))),
            [_] => Ok(()),
            [first, ..] => {
                warn!(
                    "Event type '{}' of event '{}' declares {} fields, Hyperledger Fabric only supports a single event value; only '{}' is set",
                    event.event_type.name,
                    event.event_name,
                    fields.len(),
                    first.field
                );
                Ok(())
            }
        }
    }
}
