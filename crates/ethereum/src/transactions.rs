//! Blocks, transactions and plain value transfers.
//!
//! [`EthereumBlockchain`] reads blocks and transactions from a [`BlockSource`]
//! and maps them into [`Block`] and [`Transaction`]. [`TransferBuilder`]
//! validates a transfer and produces a [`TransferRequest`] that is sent
//! through a [`Web3Client`].

use crate::api::ContractGasProvider;
use crate::client::{TransactionData, TransactionRequest, Web3Client};
use crate::receipt::{PollingConfig, PollingReceiptProcessor};
use async_trait::async_trait;
use chainbind_core::CallError;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Recipient of transactions that go nowhere.
pub const NULL_RECIPIENT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Name passed to the gas provider for plain transfers.
pub const TRANSFER_GAS_KEY: &str = "transfer";

/// Number of data bytes shown in debug logs.
const LOGGED_DATA_BYTES: usize = 50;

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid"));

/// Errors of block lookups and transfers.
#[derive(Error, Debug)]
pub enum BlockchainError {
    /// A block could not be retrieved.
    #[error("Failed to retrieve block '{block}': {message}")]
    Block {
        /// Block number or hash.
        block: String,
        /// Reason.
        message: String,
    },

    /// The latest block could not be retrieved.
    #[error("Failed to retrieve latest block: {message}")]
    LatestBlock {
        /// Reason.
        message: String,
    },

    /// A transaction could not be retrieved.
    #[error("Failed to retrieve transaction '{hash}': {message}")]
    Transaction {
        /// Transaction hash.
        hash: String,
        /// Reason.
        message: String,
    },

    /// A transfer failed validation.
    #[error("Invalid Transaction: {0}")]
    Validation(String),

    /// A transfer was rejected by the node or failed on chain.
    #[error("Failed to execute transaction with recipient '{recipient}'")]
    Send {
        /// Recipient address.
        recipient: String,
        /// Underlying error.
        #[source]
        source: CallError,
    },

    /// A detached transfer task did not complete.
    #[error("Transfer worker failed: {0}")]
    Worker(String),
}

/// A transaction as returned by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTransaction {
    /// Transaction hash.
    pub hash: String,
    /// Containing block, `None` while pending.
    pub block_hash: Option<String>,
    /// Number of the containing block.
    pub block_number: Option<u64>,
    /// Position in the block.
    pub transaction_index: Option<u64>,
    /// Sender address.
    pub from: String,
    /// Recipient address, `None` for contract creations.
    pub to: Option<String>,
    /// Wei transferred.
    pub value: BigInt,
    /// `0x` prefixed input data.
    pub input: String,
    /// Signature recovery value.
    pub v: Option<u64>,
}

/// A block with full transaction objects as returned by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeBlock {
    /// Block number, `None` while pending.
    pub number: Option<u64>,
    /// Block hash, `None` while pending.
    pub hash: Option<String>,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Transactions of the block.
    pub transactions: Vec<NodeTransaction>,
}

/// Stream of node items; an `Err` item is terminal.
pub type NodeStream<T> = BoxStream<'static, Result<T, CallError>>;

/// Block and transaction queries of a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Block by number, `None` if unknown.
    async fn block_by_number(&self, number: u64) -> Result<Option<NodeBlock>, CallError>;

    /// Block by hash, `None` if unknown.
    async fn block_by_hash(&self, hash: &str) -> Result<Option<NodeBlock>, CallError>;

    /// The most recent block.
    async fn latest_block(&self) -> Result<Option<NodeBlock>, CallError>;

    /// Transaction by hash, `None` if unknown.
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<NodeTransaction>, CallError>;

    /// New blocks as they are mined.
    fn new_blocks(&self) -> Result<NodeStream<NodeBlock>, CallError>;

    /// New transactions as they are mined.
    fn new_transactions(&self) -> Result<NodeStream<NodeTransaction>, CallError>;
}

/// A mined transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Number of the containing block.
    pub block_number: Option<u64>,
    /// Hash of the containing block.
    pub block_hash: Option<String>,
    /// Transaction hash.
    pub hash: String,
    /// Time of the containing block; only known for transactions read with their block.
    pub timestamp: Option<DateTime<Utc>>,
    /// Sender address.
    pub sender: String,
    /// Recipient address.
    pub recipient: Option<String>,
    /// Wei transferred.
    pub value: BigInt,
    /// Decoded input data.
    pub data: Vec<u8>,
    /// Signature recovery value.
    pub v: Option<u64>,
}

impl Transaction {
    /// Whether Quorum marked the transaction as private.
    ///
    /// Private transactions carry the hash of the private payload as data.
    pub fn is_private(&self) -> bool {
        matches!(self.v, Some(37) | Some(38))
    }
}

/// A mined block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Block number.
    pub block_number: Option<u64>,
    /// Block hash.
    pub block_hash: Option<String>,
    /// Block time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Transactions ordered by their index in the block.
    pub transactions: Vec<Transaction>,
}

/// Stream of mapped blocks or transactions; an `Err` item is terminal.
pub type BlockchainStream<T> = BoxStream<'static, Result<T, BlockchainError>>;

/// Read access to blocks and transactions.
pub struct EthereumBlockchain<S: ?Sized> {
    source: Arc<S>,
}

impl<S: BlockSource + ?Sized> EthereumBlockchain<S> {
    /// Creates the reader.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Block `number`.
    pub async fn block_by_number(&self, number: u64) -> Result<Block, BlockchainError> {
        let failed = |message: String| BlockchainError::Block {
            block: number.to_string(),
            message,
        };
        match self.source.block_by_number(number).await {
            Ok(Some(block)) => map_block(block).map_err(failed),
            Ok(None) => Err(failed("Block not found".to_string())),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    /// Block with hash `hash`.
    pub async fn block_by_hash(&self, hash: &str) -> Result<Block, BlockchainError> {
        let failed = |message: String| BlockchainError::Block {
            block: hash.to_string(),
            message,
        };
        match self.source.block_by_hash(hash).await {
            Ok(Some(block)) => map_block(block).map_err(failed),
            Ok(None) => Err(failed("Block not found".to_string())),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    /// The most recent block.
    pub async fn latest_block(&self) -> Result<Block, BlockchainError> {
        let failed = |message: String| BlockchainError::LatestBlock { message };
        match self.source.latest_block().await {
            Ok(Some(block)) => map_block(block).map_err(failed),
            Ok(None) => Err(failed("Block not found".to_string())),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    /// Transaction with hash `hash`.
    pub async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, BlockchainError> {
        let failed = |message: String| BlockchainError::Transaction {
            hash: hash.to_string(),
            message,
        };
        match self.source.transaction_by_hash(hash).await {
            Ok(Some(transaction)) => map_transaction(transaction, None).map_err(failed),
            Ok(None) => Err(failed("Transaction not found".to_string())),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    /// Blocks as they are mined.
    pub fn blocks(&self) -> Result<BlockchainStream<Block>, BlockchainError> {
        let blocks = self.source.new_blocks().map_err(|e| BlockchainError::LatestBlock {
            message: e.to_string(),
        })?;
        Ok(blocks
            .map(|item| {
                let block = item.map_err(|e| BlockchainError::LatestBlock { message: e.to_string() })?;
                let label = block_label(&block);
                map_block(block).map_err(|message| BlockchainError::Block { block: label, message })
            })
            .boxed())
    }

    /// Transactions as they are mined.
    pub fn transactions(&self) -> Result<BlockchainStream<Transaction>, BlockchainError> {
        let transactions = self.source.new_transactions().map_err(|e| BlockchainError::Transaction {
            hash: String::new(),
            message: e.to_string(),
        })?;
        Ok(transactions
            .map(|item| {
                let transaction = item.map_err(|e| BlockchainError::Transaction {
                    hash: String::new(),
                    message: e.to_string(),
                })?;
                let hash = transaction.hash.clone();
                map_transaction(transaction, None).map_err(|message| BlockchainError::Transaction { hash, message })
            })
            .boxed())
    }
}

fn block_label(block: &NodeBlock) -> String {
    match (&block.hash, block.number) {
        (Some(hash), _) => hash.clone(),
        (None, Some(number)) => number.to_string(),
        (None, None) => "pending".to_string(),
    }
}

fn timestamp(seconds: u64) -> Option<DateTime<Utc>> {
    i64::try_from(seconds)
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
}

fn map_block(block: NodeBlock) -> Result<Block, String> {
    let timestamp = timestamp(block.timestamp);
    let mut transactions = block.transactions;
    transactions.sort_by_key(|t| t.transaction_index);
    let transactions = transactions
        .into_iter()
        .map(|t| map_transaction(t, timestamp))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Block {
        block_number: block.number,
        block_hash: block.hash,
        timestamp,
        transactions,
    })
}

fn map_transaction(transaction: NodeTransaction, timestamp: Option<DateTime<Utc>>) -> Result<Transaction, String> {
    let data = decode_data(&transaction.input)
        .map_err(|e| format!("Invalid input data of transaction '{}': {}", transaction.hash, e))?;
    Ok(Transaction {
        block_number: transaction.block_number,
        block_hash: transaction.block_hash,
        hash: transaction.hash,
        timestamp,
        sender: transaction.from,
        recipient: transaction.to,
        value: transaction.value,
        data,
        v: transaction.v,
    })
}

/// Decodes `0x` prefixed hex; anything without digits is empty.
fn decode_data(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    match input.trim().strip_prefix("0x") {
        Some(digits) if !digits.is_empty() => hex::decode(digits),
        _ => Ok(Vec::new()),
    }
}

/// Builds a validated [`TransferRequest`].
///
/// The sender is whichever account the client signs with. Unset or
/// negative gas values fall back to the gas provider's values for
/// [`TRANSFER_GAS_KEY`].
pub struct TransferBuilder<W: ?Sized> {
    client: Arc<W>,
    gas_provider: Arc<dyn ContractGasProvider>,
    polling: PollingConfig,
    recipient: Option<String>,
    data: Option<Vec<u8>>,
    gas_price: Option<BigInt>,
    gas_limit: Option<BigInt>,
    value: Option<BigInt>,
    private_for: Option<Vec<String>>,
}

impl<W: Web3Client + ?Sized> TransferBuilder<W> {
    /// Starts a transfer sent through `client`.
    pub fn new(client: Arc<W>, gas_provider: Arc<dyn ContractGasProvider>, polling: PollingConfig) -> Self {
        Self {
            client,
            gas_provider,
            polling,
            recipient: None,
            data: None,
            gas_price: None,
            gas_limit: None,
            value: None,
            private_for: None,
        }
    }

    /// Recipient address; the `0x` prefix is optional.
    pub fn with_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sends to [`NULL_RECIPIENT_ADDRESS`].
    pub fn with_null_recipient(self) -> Self {
        self.with_recipient(NULL_RECIPIENT_ADDRESS)
    }

    /// Data embedded in the transaction.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Gas price in wei.
    pub fn with_gas_price(mut self, gas_price: BigInt) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Gas limit.
    pub fn with_gas_limit(mut self, gas_limit: BigInt) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Ether to transfer, in wei.
    pub fn with_ether(mut self, wei: BigInt) -> Self {
        self.value = Some(wei);
        self
    }

    /// Same as [`with_ether`](Self::with_ether).
    pub fn with_value(self, value: BigInt) -> Self {
        self.with_ether(value)
    }

    /// Private transaction recipients, replacing any set before.
    pub fn with_private_for(mut self, recipients: Vec<String>) -> Self {
        self.private_for = Some(recipients);
        self
    }

    /// Adds one private transaction recipient.
    pub fn add_private_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.private_for.get_or_insert_with(Vec::new).push(recipient.into());
        self
    }

    /// Validates the transfer and fills in defaults.
    pub fn build(self) -> Result<TransferRequest<W>, BlockchainError> {
        debug!("Validating transaction...");
        let recipient = validate_recipient(self.recipient)?;
        let gas_limit = or_default("Gas limit", self.gas_limit, || self.gas_provider.gas_limit(TRANSFER_GAS_KEY));
        let gas_price = or_default("Gas price", self.gas_price, || self.gas_provider.gas_price(TRANSFER_GAS_KEY));
        let value = validate_value(self.value)?;
        let data = self.data.unwrap_or_default();
        if data.is_empty() {
            debug!("No data to embed");
        } else {
            debug!(
                "Data ({} byte{}): 0x{}{}",
                data.len(),
                if data.len() != 1 { "s" } else { "" },
                hex::encode(&data[..data.len().min(LOGGED_DATA_BYTES)]),
                if data.len() > LOGGED_DATA_BYTES { "..." } else { "" }
            );
        }
        if let Some(private_for) = &self.private_for {
            debug!("Private for: {}", private_for.join(", "));
        }

        Ok(TransferRequest {
            receipts: PollingReceiptProcessor::new(Arc::clone(&self.client), self.polling),
            client: self.client,
            recipient,
            data,
            gas_price,
            gas_limit,
            value,
            private_for: self.private_for,
        })
    }
}

fn validate_recipient(recipient: Option<String>) -> Result<String, BlockchainError> {
    let recipient = match recipient.map(|r| r.trim().to_string()) {
        Some(r) if !r.is_empty() => r,
        _ => return Err(invalid("Recipient is not set")),
    };
    let recipient = if recipient.starts_with("0x") {
        recipient
    } else {
        format!("0x{}", recipient)
    };
    if !ADDRESS_PATTERN.is_match(&recipient) {
        return Err(invalid("Invalid recipient! Recipient address needs to be a byte hex string!"));
    }
    debug!("Transaction recipient: {}", recipient);
    Ok(recipient)
}

fn validate_value(value: Option<BigInt>) -> Result<BigInt, BlockchainError> {
    match value {
        None => {
            debug!("No Ether to be sent");
            Ok(BigInt::zero())
        }
        Some(value) if value.is_negative() => Err(invalid("Invalid amount of Ether to be transferred: Value is negative!")),
        Some(value) => {
            debug!("Value: {} Wei", value);
            Ok(value)
        }
    }
}

fn or_default(what: &str, value: Option<BigInt>, default: impl FnOnce() -> BigInt) -> BigInt {
    match value {
        Some(value) if !value.is_negative() => {
            debug!("{}: {}", what, value);
            value
        }
        Some(value) => {
            let fallback = default();
            warn!("Negative {} ({}) not allowed, defaulting to '{}'", what.to_lowercase(), value, fallback);
            fallback
        }
        None => {
            let fallback = default();
            debug!("{} not set, defaulting to '{}'", what, fallback);
            fallback
        }
    }
}

fn invalid(message: &str) -> BlockchainError {
    error!("Invalid Transaction: {}", message);
    BlockchainError::Validation(message.to_string())
}

/// A validated transfer.
pub struct TransferRequest<W: ?Sized> {
    client: Arc<W>,
    receipts: PollingReceiptProcessor<W>,
    recipient: String,
    data: Vec<u8>,
    gas_price: BigInt,
    gas_limit: BigInt,
    value: BigInt,
    private_for: Option<Vec<String>>,
}

impl<W: ?Sized> fmt::Debug for TransferRequest<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("recipient", &self.recipient)
            .field("data", &hex::encode(&self.data))
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .field("value", &self.value)
            .field("private_for", &self.private_for)
            .finish()
    }
}

impl<W: Web3Client + ?Sized> TransferRequest<W> {
    /// `0x` prefixed recipient address.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Embedded data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gas price in wei.
    pub fn gas_price(&self) -> &BigInt {
        &self.gas_price
    }

    /// Gas limit.
    pub fn gas_limit(&self) -> &BigInt {
        &self.gas_limit
    }

    /// Wei transferred.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// Private transaction recipients.
    pub fn private_for(&self) -> Option<&[String]> {
        self.private_for.as_deref()
    }

    /// Sends the transfer, waits for its receipt and returns the transaction hash.
    pub async fn send(&self) -> Result<String, BlockchainError> {
        let failed = |source: CallError| BlockchainError::Send {
            recipient: self.recipient.clone(),
            source,
        };
        let request = TransactionRequest {
            to: Some(self.recipient.clone()),
            data: TransactionData::Transfer(self.data.clone()),
            gas_price: self.gas_price.clone(),
            gas_limit: self.gas_limit.clone(),
            value: self.value.clone(),
            private_for: self.private_for.clone(),
        };
        let hash = self.client.send_transaction(request).await.map_err(failed)?;
        debug!("Sent transfer {} to {}", hash, self.recipient);
        let receipt = self
            .receipts
            .wait_for_receipt(&hash)
            .await
            .and_then(|receipt| receipt.ensure_success())
            .map_err(failed)?;
        Ok(receipt.transaction_hash)
    }

    /// Sends the transfer on a tokio task.
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<String, BlockchainError>>
    where
        W: 'static,
    {
        tokio::spawn(async move { self.send().await })
    }
}
