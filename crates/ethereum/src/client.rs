//! [`Web3ContractApi`] over a low level node client.

use crate::abi::{normalize_address, AbiDefinition, AbiValue};
use crate::api::{
    BlockParameter, Deployment, EventLogApi, EventLogRequest, EventLogStream, FunctionCall, TransactionParams,
    Web3ContractApi,
};
use crate::receipt::{PollingConfig, PollingReceiptProcessor, ReceiptSource, TransactionReceipt};
use async_trait::async_trait;
use chainbind_core::{CallError, CallResult};
use num_bigint::BigInt;
use std::sync::Arc;
use tracing::{debug, info};

/// Payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionData {
    /// A function call.
    Call(FunctionCall),
    /// A contract creation.
    Deploy(Deployment),
    /// Raw data of a plain value transfer.
    Transfer(Vec<u8>),
}

/// A transaction ready to be signed and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Recipient; `None` creates a contract.
    pub to: Option<String>,
    /// Payload.
    pub data: TransactionData,
    /// Gas price in wei.
    pub gas_price: BigInt,
    /// Gas limit.
    pub gas_limit: BigInt,
    /// Wei transferred.
    pub value: BigInt,
    /// Private transaction recipients.
    pub private_for: Option<Vec<String>>,
}

/// Log filter of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract.
    pub address: String,
    /// Signature topic.
    pub topic: String,
    /// The event's ABI entry, used to decode logs.
    pub event: AbiDefinition,
    /// First block.
    pub from_block: BlockParameter,
    /// Last block.
    pub to_block: BlockParameter,
}

/// Node operations: encoding, signing and transport are left to implementors.
#[async_trait]
pub trait Web3Client: ReceiptSource {
    /// Executes a function without a transaction and decodes its outputs.
    async fn call(&self, call: &FunctionCall) -> Result<Vec<AbiValue>, CallError>;

    /// Signs and sends a transaction, returning its hash.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<String, CallError>;

    /// Opens a stream of decoded logs.
    fn logs(&self, filter: LogFilter) -> Result<EventLogStream, CallError>;
}

/// Contract API sending through a [`Web3Client`] and waiting for receipts.
pub struct ClientContractApi<W: Web3Client + ?Sized> {
    client: Arc<W>,
    receipts: PollingReceiptProcessor<W>,
}

impl<W: Web3Client + ?Sized> ClientContractApi<W> {
    /// Creates the API.
    pub fn new(client: Arc<W>, polling: PollingConfig) -> Self {
        Self {
            receipts: PollingReceiptProcessor::new(Arc::clone(&client), polling),
            client,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<W> {
        &self.client
    }

    async fn execute(&self, request: TransactionRequest) -> Result<TransactionReceipt, CallError> {
        let hash = self.client.send_transaction(request).await?;
        debug!("Sent transaction {}", hash);
        self.receipts.wait_for_receipt(&hash).await?.ensure_success()
    }
}

impl<W: Web3Client + ?Sized> EventLogApi for ClientContractApi<W> {
    fn event_logs(&self, request: EventLogRequest) -> Result<EventLogStream, CallError> {
        let filter = LogFilter {
            address: normalize_address(&request.contract_address),
            topic: request.event.topic(),
            event: request.event,
            from_block: request.from_block,
            to_block: request.to_block,
        };
        debug!(
            "Filtering logs of {} with topic {} from {} to {}",
            filter.address, filter.topic, filter.from_block, filter.to_block
        );
        self.client.logs(filter)
    }
}

#[async_trait]
impl<W: Web3Client + ?Sized> Web3ContractApi for ClientContractApi<W> {
    async fn call(&self, mut call: FunctionCall) -> Result<Vec<AbiValue>, CallError> {
        call.contract_address = normalize_address(&call.contract_address);
        self.client.call(&call).await
    }

    async fn transact(&self, mut call: FunctionCall, params: TransactionParams) -> Result<CallResult<Vec<AbiValue>>, CallError> {
        call.contract_address = normalize_address(&call.contract_address);
        let outputs = if call.outputs.is_empty() {
            Vec::new()
        } else {
            self.client.call(&call).await?
        };

        info!("Calling '{}' on {}", call.name, call.contract_address);
        let request = TransactionRequest {
            to: Some(call.contract_address.clone()),
            data: TransactionData::Call(call),
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            value: params.value.unwrap_or_default(),
            private_for: params.private_for,
        };
        let receipt = self.execute(request).await?;
        Ok(CallResult::recorded(outputs, receipt.block_hash, receipt.transaction_hash))
    }

    async fn deploy(&self, deployment: Deployment, params: TransactionParams) -> Result<CallResult<String>, CallError> {
        info!("Deploying contract ({} constructor arguments)", deployment.constructor_arguments.len());
        let request = TransactionRequest {
            to: None,
            data: TransactionData::Deploy(deployment),
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            value: params.value.unwrap_or_default(),
            private_for: params.private_for,
        };
        let receipt = self.execute(request).await?;
        let address = receipt
            .contract_address
            .as_deref()
            .map(normalize_address)
            .ok_or_else(|| CallError::client("Deployment receipt does not contain a contract address"))?;
        Ok(CallResult::recorded(address, receipt.block_hash, receipt.transaction_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::NamedType;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeNode {
        status: Option<String>,
        sent: Mutex<Vec<TransactionRequest>>,
        filters: Mutex<Vec<LogFilter>>,
    }

    #[async_trait]
    impl ReceiptSource for FakeNode {
        async fn transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>, CallError> {
            Ok(Some(TransactionReceipt {
                transaction_hash: hash.to_string(),
                block_hash: "0xblock".to_string(),
                block_number: 1,
                status: self.status.clone(),
                contract_address: Some("c0ffee".to_string()),
            }))
        }

        async fn block_number(&self) -> Result<u64, CallError> {
            Ok(1)
        }
    }

    #[async_trait]
    impl Web3Client for FakeNode {
        async fn call(&self, call: &FunctionCall) -> Result<Vec<AbiValue>, CallError> {
            Ok(vec![AbiValue::String(call.contract_address.clone())])
        }

        async fn send_transaction(&self, request: TransactionRequest) -> Result<String, CallError> {
            self.sent.lock().push(request);
            Ok("0xtx".to_string())
        }

        fn logs(&self, filter: LogFilter) -> Result<EventLogStream, CallError> {
            self.filters.lock().push(filter);
            Ok(futures::stream::empty().boxed())
        }
    }

    fn polling() -> PollingConfig {
        PollingConfig {
            sleep_duration: Duration::from_millis(1),
            attempts: 1,
            confirmation_blocks: 0,
            block_time: Duration::from_millis(1),
        }
    }

    fn call() -> FunctionCall {
        FunctionCall {
            contract_address: "abc".to_string(),
            name: "setGreeting".to_string(),
            inputs: vec![AbiValue::String("hi".to_string())],
            outputs: vec![NamedType::new("", "string")],
        }
    }

    #[tokio::test]
    async fn test_transact_normalizes_address_and_defaults_value() {
        let node = Arc::new(FakeNode::default());
        let api = ClientContractApi::new(Arc::clone(&node), polling());

        let result = api
            .transact(
                call(),
                TransactionParams {
                    gas_price: BigInt::from(1),
                    gas_limit: BigInt::from(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.data, vec![AbiValue::String("0xabc".to_string())]);
        assert_eq!(result.transaction_hash.as_deref(), Some("0xtx"));

        let sent = node.sent.lock();
        assert_eq!(sent[0].to.as_deref(), Some("0xabc"));
        assert_eq!(sent[0].value, BigInt::from(0));
    }

    #[tokio::test]
    async fn test_failed_status_is_reported() {
        let node = Arc::new(FakeNode {
            status: Some("0x0".to_string()),
            ..Default::default()
        });
        let api = ClientContractApi::new(node, polling());
        let err = api.transact(call(), TransactionParams::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to execute transaction, status: '0x0'.");
    }

    #[tokio::test]
    async fn test_deploy_returns_created_address() {
        let node = Arc::new(FakeNode::default());
        let api = ClientContractApi::new(Arc::clone(&node), polling());
        let deployment = Deployment {
            binary: "0x6080".to_string(),
            constructor_arguments: vec![],
        };
        let result = api.deploy(deployment, TransactionParams::default()).await.unwrap();
        assert_eq!(result.data, "0xc0ffee");
        assert_eq!(node.sent.lock()[0].to, None);
    }

    #[test]
    fn test_event_logs_carry_the_topic() {
        let node = Arc::new(FakeNode::default());
        let api = ClientContractApi::new(Arc::clone(&node), polling());
        let event = AbiDefinition::event("Greeted", vec![NamedType::new("name", "string")]);
        api.event_logs(EventLogRequest {
            contract_address: "abc".to_string(),
            event: event.clone(),
            from_block: BlockParameter::Earliest,
            to_block: BlockParameter::Latest,
        })
        .unwrap();

        let filters = node.filters.lock();
        assert_eq!(filters[0].address, "0xabc");
        assert_eq!(filters[0].topic, event.topic());
    }
}
