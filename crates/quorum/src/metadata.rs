//! Quorum binding data.

use chainbind_core::{Chain, ContractBinding};
use chainbind_ethereum::metadata::{AbiEvent, AbiEventField, AbiMethod, AbiParameter};
use chainbind_ethereum::{AbiChain, EthereumContract};
use serde::{Deserialize, Serialize};

/// Quorum chain marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum;

/// ABI contract data plus the default private transaction recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumContract {
    /// ABI, binary and address.
    #[serde(flatten)]
    pub ethereum: EthereumContract,
    /// Recipients of transactions that name none; empty sends public transactions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_for: Vec<String>,
}

impl Chain for Quorum {
    const NAME: &'static str = "quorum";
    type Contract = QuorumContract;
    type Method = AbiMethod;
    type Parameter = AbiParameter;
    type Event = AbiEvent;
    type EventField = AbiEventField;
}

impl AbiChain for Quorum {
    fn contract_info(contract: &QuorumContract) -> &EthereumContract {
        &contract.ethereum
    }
}

/// Default private transaction recipients of a built binding.
pub fn private_for(binding: &ContractBinding<Quorum>) -> &[String] {
    &binding.chain().private_for
}
