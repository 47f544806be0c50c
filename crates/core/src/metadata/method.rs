use super::{Chain, SpecialArguments};
use crate::ids::{MethodId, ParameterId};
use crate::types::NativeType;
use serde::{Deserialize, Serialize};

/// Binding of one declared method parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ParameterBinding<C: Chain> {
    pub(crate) id: ParameterId,
    pub(crate) name: String,
    pub(crate) ty: NativeType,
    pub(crate) converter: Option<String>,
    pub(crate) pass_as: Option<NativeType>,
    pub(crate) special_argument: Option<String>,
    pub(crate) chain: C::Parameter,
}

impl<C: Chain> ParameterBinding<C> {
    /// Stable identifier.
    pub fn id(&self) -> &ParameterId {
        &self.id
    }

    /// Zero based position within the declared signature.
    pub fn index(&self) -> usize {
        self.id.index
    }

    /// Declared parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> &NativeType {
        &self.ty
    }

    /// Explicit converter.
    pub fn converter(&self) -> Option<&str> {
        self.converter.as_deref()
    }

    /// Intermediate type the argument is passed as.
    pub fn pass_as(&self) -> Option<&NativeType> {
        self.pass_as.as_ref()
    }

    /// Special argument tag.
    pub fn special_argument(&self) -> Option<&str> {
        self.special_argument.as_deref()
    }

    /// Whether the parameter is consumed by the dispatcher instead of the contract.
    pub fn is_special_argument(&self) -> bool {
        self.special_argument.is_some()
    }

    /// Chain specific data.
    pub fn chain(&self) -> &C::Parameter {
        &self.chain
    }
}

/// Binding of one declared method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MethodBinding<C: Chain> {
    pub(crate) id: MethodId,
    pub(crate) contract_method_name: String,
    pub(crate) read_only: bool,
    pub(crate) special_method: bool,
    pub(crate) asynchronous: bool,
    pub(crate) result_type: NativeType,
    pub(crate) wrapped: bool,
    pub(crate) result_converter: Option<String>,
    pub(crate) parameters: Vec<ParameterBinding<C>>,
    pub(crate) chain: C::Method,
}

impl<C: Chain> MethodBinding<C> {
    /// Stable identifier of the declared method.
    pub fn id(&self) -> &MethodId {
        &self.id
    }

    /// Name the contract knows the method by.
    pub fn contract_method_name(&self) -> &str {
        &self.contract_method_name
    }

    /// Whether the method is issued as a query.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether the method maps onto a chain specific operation.
    pub fn is_special_method(&self) -> bool {
        self.special_method
    }

    /// Whether callers receive a pending handle.
    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    /// Whether the method returns nothing.
    pub fn is_void_return(&self) -> bool {
        self.result_type == NativeType::Void
    }

    /// Declared result type, without the hash wrapper.
    pub fn result_type(&self) -> &NativeType {
        &self.result_type
    }

    /// Whether results are wrapped with block and transaction hashes.
    pub fn uses_result_wrapper(&self) -> bool {
        self.wrapped
    }

    /// Converter applied to results.
    pub fn result_converter(&self) -> Option<&str> {
        self.result_converter.as_deref()
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterBinding<C>] {
        &self.parameters
    }

    /// Parameters passed positionally to the contract.
    pub fn contract_parameters(&self) -> impl Iterator<Item = &ParameterBinding<C>> {
        self.parameters.iter().filter(|p| !p.is_special_argument())
    }

    /// Chain specific data.
    pub fn chain(&self) -> &C::Method {
        &self.chain
    }
}

impl<C: Chain> SpecialArguments for MethodBinding<C> {
    fn special_tags(&self) -> Vec<Option<&str>> {
        self.parameters.iter().map(ParameterBinding::special_argument).collect()
    }
}
