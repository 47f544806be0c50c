//! # Chainbind Ethereum
//!
//! Contract bindings for chains following the Ethereum ABI.
//!
//! [`EthereumContractBuilder`] resolves every bound method, parameter and
//! event against a contract ABI. [`EthereumHandler`] executes dispatched calls
//! through a [`Web3ContractApi`]: deployments record the contract address,
//! read-only methods become calls and everything else a transaction whose
//! gas parameters come from special arguments or a [`ContractGasProvider`].
//!
//! ## Example
//!
//! ```rust
//! use chainbind_ethereum::abi::AbiType;
//!
//! let ty: AbiType = "uint16[3][5]".parse().unwrap();
//! assert_eq!(ty.to_string(), "uint16[3][5]");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// ABI entries, types and wire values
pub mod abi;
/// The contract API the dispatcher talks to
pub mod api;
/// Binding builder
pub mod builder;
/// Contract API over a low level node client
pub mod client;
/// Argument and result conversion
pub mod converter;
/// Call execution
pub mod handler;
/// Chain specific binding data
pub mod metadata;
/// Receipt polling
pub mod receipt;
/// ABI resolution of bindings
pub mod schema;
/// Special method and argument names
pub mod special;
/// Blocks, transactions and value transfers
pub mod transactions;

pub use abi::{AbiDefinition, AbiType, AbiValue};
pub use api::{BlockParameter, ContractGasProvider, StaticGasProvider, Web3ContractApi};
pub use builder::EthereumContractBuilder;
pub use client::{ClientContractApi, Web3Client};
pub use converter::AbiArgumentConverter;
pub use handler::{AbiCallExecutor, EthereumHandler};
pub use metadata::{contract_info, AbiChain, Ethereum, EthereumContract};
pub use receipt::{PollingConfig, PollingReceiptProcessor, ReceiptSource, TransactionReceipt};
pub use schema::AbiSchema;
pub use transactions::{Block, BlockSource, BlockchainError, EthereumBlockchain, Transaction, TransferBuilder, TransferRequest};
