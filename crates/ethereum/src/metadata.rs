//! Ethereum specific binding data.

use crate::abi::{AbiDefinition, AbiType, NamedType};
use chainbind_core::{Chain, ContractBinding, DeploymentAddress};
use serde::{Deserialize, Serialize};

/// Marker for Ethereum bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ethereum;

/// Contract level data of an ABI based binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumContract {
    /// Deployment address, set once when deployed through the binding.
    #[serde(default)]
    pub address: DeploymentAddress,
    /// The contract ABI.
    pub abi: Vec<AbiDefinition>,
    /// Hex encoded contract binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
}

impl EthereumContract {
    /// Contract data for an ABI, without binary or address.
    pub fn new(abi: Vec<AbiDefinition>) -> Self {
        Self {
            address: DeploymentAddress::unset(),
            abi,
            binary: None,
        }
    }
}

/// ABI entry a method is bound to; special methods other than deploy have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiMethod {
    /// The function or constructor entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<AbiDefinition>,
}

impl AbiMethod {
    /// Output parameters of the bound function.
    pub fn outputs(&self) -> &[NamedType] {
        self.abi.as_ref().map(|abi| abi.outputs.as_slice()).unwrap_or_default()
    }
}

/// Solidity type of a contract argument; special arguments have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParameter {
    /// Type string without data location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solidity_type: Option<String>,
}

/// ABI entry an event is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEvent {
    /// The event entry.
    pub abi: AbiDefinition,
}

impl AbiEvent {
    /// Signature topic of the event.
    pub fn topic(&self) -> String {
        self.abi.topic()
    }
}

/// Remote event parameter a field reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEventField {
    /// Parameter name.
    pub name: String,
    /// Type string without data location.
    pub solidity_type: String,
    /// Whether the value is read from the log topics.
    pub indexed: bool,
    /// Position among the indexed, respectively non-indexed, values of the log.
    pub slot: usize,
}

impl AbiEventField {
    /// Parsed type of the field.
    pub fn abi_type(&self) -> Result<AbiType, chainbind_core::ConvertError> {
        AbiType::parse(&self.solidity_type)
    }
}

/// Chains sharing the Ethereum ABI rules.
pub trait AbiChain:
    Chain<Method = AbiMethod, Parameter = AbiParameter, Event = AbiEvent, EventField = AbiEventField>
{
    /// ABI, binary and address of a contract.
    fn contract_info(contract: &Self::Contract) -> &EthereumContract;
}

impl Chain for Ethereum {
    const NAME: &'static str = "ethereum";
    type Contract = EthereumContract;
    type Method = AbiMethod;
    type Parameter = AbiParameter;
    type Event = AbiEvent;
    type EventField = AbiEventField;
}

impl AbiChain for Ethereum {
    fn contract_info(contract: &EthereumContract) -> &EthereumContract {
        contract
    }
}

/// ABI, binary and address of a built binding.
pub fn contract_info<C: AbiChain>(binding: &ContractBinding<C>) -> &EthereumContract {
    C::contract_info(binding.chain())
}
