//! The contract API the Ethereum dispatcher talks to.
//!
//! Implementations own the RPC connection, signing and ABI encoding. The
//! dispatcher only hands them wire typed values and reads wire typed values back.

use crate::abi::{AbiDefinition, AbiValue, NamedType};
use async_trait::async_trait;
use chainbind_core::{CallError, CallResult, Value};
use futures::stream::BoxStream;
use num_bigint::BigInt;
use std::fmt;
use std::str::FromStr;

/// Block selector for event ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockParameter {
    /// The most recent block.
    #[default]
    Latest,
    /// The genesis block.
    Earliest,
    /// Pending transactions.
    Pending,
    /// A block by number.
    Number(u64),
}

impl BlockParameter {
    /// Type name block parameters carry when passed as opaque special arguments.
    pub const TYPE_NAME: &'static str = "BlockParameter";

    /// Reads a block range special argument.
    ///
    /// Accepts opaque block parameters, non-negative integers and the names
    /// `latest`, `earliest` and `pending`; anything else selects the latest block.
    pub fn from_argument(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Opaque(opaque)) => opaque.downcast_ref::<BlockParameter>().copied().unwrap_or_default(),
            Some(Value::String(text)) => text.parse().unwrap_or_default(),
            Some(number) => number
                .to_long()
                .and_then(|n| u64::try_from(n).ok())
                .map(BlockParameter::Number)
                .unwrap_or_default(),
            None => BlockParameter::Latest,
        }
    }
}

impl From<BlockParameter> for Value {
    fn from(block: BlockParameter) -> Self {
        Value::opaque(BlockParameter::TYPE_NAME, block)
    }
}

impl fmt::Display for BlockParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockParameter::Latest => write!(f, "latest"),
            BlockParameter::Earliest => write!(f, "earliest"),
            BlockParameter::Pending => write!(f, "pending"),
            BlockParameter::Number(n) => write!(f, "0x{:x}", n),
        }
    }
}

impl FromStr for BlockParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(BlockParameter::Latest),
            "earliest" => Ok(BlockParameter::Earliest),
            "pending" => Ok(BlockParameter::Pending),
            other => {
                let parsed = match other.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => other.parse::<u64>(),
                };
                parsed
                    .map(BlockParameter::Number)
                    .map_err(|_| format!("Invalid block parameter: {}", s))
            }
        }
    }
}

/// Gas price and limit per contract function.
pub trait ContractGasProvider: Send + Sync + fmt::Debug {
    /// Gas price for calls of `method`.
    fn gas_price(&self, method: &str) -> BigInt;

    /// Gas limit for calls of `method`.
    fn gas_limit(&self, method: &str) -> BigInt;
}

/// The same gas price and limit for every function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticGasProvider {
    gas_price: BigInt,
    gas_limit: BigInt,
}

impl StaticGasProvider {
    /// Default gas price, 4.1 gwei.
    pub const GAS_PRICE: u64 = 4_100_000_000;
    /// Default gas limit.
    pub const GAS_LIMIT: u64 = 9_000_000;

    /// Creates a provider.
    pub fn new(gas_price: BigInt, gas_limit: BigInt) -> Self {
        Self { gas_price, gas_limit }
    }
}

impl Default for StaticGasProvider {
    fn default() -> Self {
        Self::new(BigInt::from(Self::GAS_PRICE), BigInt::from(Self::GAS_LIMIT))
    }
}

impl ContractGasProvider for StaticGasProvider {
    fn gas_price(&self, _method: &str) -> BigInt {
        self.gas_price.clone()
    }

    fn gas_limit(&self, _method: &str) -> BigInt {
        self.gas_limit.clone()
    }
}

/// A call of one contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// `0x` prefixed contract address.
    pub contract_address: String,
    /// Function name.
    pub name: String,
    /// Encoded arguments.
    pub inputs: Vec<AbiValue>,
    /// Declared outputs the client decodes the return data with.
    pub outputs: Vec<NamedType>,
}

/// A contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Hex encoded contract binary.
    pub binary: String,
    /// Encoded constructor arguments.
    pub constructor_arguments: Vec<AbiValue>,
}

/// Chain parameters of a state changing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionParams {
    /// Gas price in wei.
    pub gas_price: BigInt,
    /// Gas limit.
    pub gas_limit: BigInt,
    /// Wei transferred with the call, zero when absent.
    pub value: Option<BigInt>,
    /// Private transaction recipients on chains supporting them.
    pub private_for: Option<Vec<String>>,
}

/// Event subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogRequest {
    /// `0x` prefixed contract address.
    pub contract_address: String,
    /// The event's ABI entry.
    pub event: AbiDefinition,
    /// First block.
    pub from_block: BlockParameter,
    /// Last block.
    pub to_block: BlockParameter,
}

/// Decoded values of one event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventValues {
    /// Values decoded from the topics, in ABI order.
    pub indexed: Vec<AbiValue>,
    /// Values decoded from the data, in ABI order.
    pub non_indexed: Vec<AbiValue>,
}

/// One event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    /// Decoded values.
    pub values: EventValues,
    /// Hash of the block the log was emitted in.
    pub block_hash: String,
    /// Hash of the emitting transaction.
    pub transaction_hash: String,
}

/// Stream of event logs; an `Err` item is terminal.
pub type EventLogStream = BoxStream<'static, Result<EventLog, CallError>>;

/// Source of contract event logs.
pub trait EventLogApi: Send + Sync {
    /// Opens a log stream. Dropping the stream unsubscribes.
    fn event_logs(&self, request: EventLogRequest) -> Result<EventLogStream, CallError>;
}

/// Contract operations of an Ethereum client.
#[async_trait]
pub trait Web3ContractApi: EventLogApi {
    /// Executes a function without a transaction.
    async fn call(&self, call: FunctionCall) -> Result<Vec<AbiValue>, CallError>;

    /// Sends a transaction calling a function and waits for its receipt.
    ///
    /// The returned values are those the function produces for the call.
    async fn transact(&self, call: FunctionCall, params: TransactionParams) -> Result<CallResult<Vec<AbiValue>>, CallError>;

    /// Deploys a contract and returns its address.
    async fn deploy(&self, deployment: Deployment, params: TransactionParams) -> Result<CallResult<String>, CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_parameter_from_argument() {
        assert_eq!(BlockParameter::from_argument(None), BlockParameter::Latest);
        assert_eq!(BlockParameter::from_argument(Some(&Value::Long(12))), BlockParameter::Number(12));
        assert_eq!(BlockParameter::from_argument(Some(&Value::Long(-1))), BlockParameter::Latest);
        assert_eq!(BlockParameter::from_argument(Some(&Value::from("earliest"))), BlockParameter::Earliest);
        assert_eq!(BlockParameter::from_argument(Some(&Value::from("0x10"))), BlockParameter::Number(16));
        assert_eq!(
            BlockParameter::from_argument(Some(&BlockParameter::Pending.into())),
            BlockParameter::Pending
        );
        assert_eq!(BlockParameter::from_argument(Some(&Value::Bool(true))), BlockParameter::Latest);
    }

    #[test]
    fn test_static_gas_provider_defaults() {
        let provider = StaticGasProvider::default();
        assert_eq!(provider.gas_price("anything"), BigInt::from(4_100_000_000u64));
        assert_eq!(provider.gas_limit("anything"), BigInt::from(9_000_000u64));
    }
}
