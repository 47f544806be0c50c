//! Waiting for transaction receipts and confirmation blocks.

use async_trait::async_trait;
use chainbind_core::CallError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Receipt of a mined transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Hash of the containing block.
    pub block_hash: String,
    /// Number of the containing block.
    pub block_number: u64,
    /// Status as reported by the node, `0x1` on success. Pre-Byzantium receipts have none.
    pub status: Option<String>,
    /// Address of a created contract.
    pub contract_address: Option<String>,
}

impl TransactionReceipt {
    /// Whether the transaction succeeded.
    pub fn is_status_ok(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => matches!(status.trim(), "0x1" | "1"),
        }
    }

    /// Fails unless the transaction succeeded.
    pub fn ensure_success(self) -> Result<Self, CallError> {
        if self.is_status_ok() {
            Ok(self)
        } else {
            Err(CallError::TransactionFailed {
                status: self.status.unwrap_or_default(),
            })
        }
    }
}

/// Node queries the receipt processor polls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// The receipt of a transaction, `None` while it is pending.
    async fn transaction_receipt(&self, transaction_hash: &str) -> Result<Option<TransactionReceipt>, CallError>;

    /// Number of the latest block.
    async fn block_number(&self) -> Result<u64, CallError>;
}

/// Bounds of the receipt and confirmation waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Pause between receipt queries.
    pub sleep_duration: Duration,
    /// Number of receipt queries.
    pub attempts: u32,
    /// Blocks required on top of the receipt's block; zero disables the wait.
    pub confirmation_blocks: u64,
    /// Expected time between blocks.
    pub block_time: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            sleep_duration: Duration::from_millis(15_000),
            attempts: 40,
            confirmation_blocks: 12,
            block_time: Duration::from_millis(15_000),
        }
    }
}

/// Polls a [`ReceiptSource`] until a transaction is mined and confirmed.
#[derive(Debug)]
pub struct PollingReceiptProcessor<S: ?Sized> {
    source: Arc<S>,
    config: PollingConfig,
}

impl<S: ReceiptSource + ?Sized> PollingReceiptProcessor<S> {
    /// Creates a processor.
    pub fn new(source: Arc<S>, config: PollingConfig) -> Self {
        Self { source, config }
    }

    /// The polling bounds.
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Waits for the receipt of `transaction_hash` and its confirmation blocks.
    pub async fn wait_for_receipt(&self, transaction_hash: &str) -> Result<TransactionReceipt, CallError> {
        let mut receipt = self.source.transaction_receipt(transaction_hash).await?;
        let mut attempt = 0;
        while receipt.is_none() && attempt < self.config.attempts {
            tokio::time::sleep(self.config.sleep_duration).await;
            receipt = self.source.transaction_receipt(transaction_hash).await?;
            attempt += 1;
        }

        match receipt {
            Some(receipt) => self.wait_for_confirmations(transaction_hash, receipt).await,
            None => Err(CallError::timeout(format!(
                "Transaction receipt was not generated after {} seconds for transaction: {}",
                self.config.sleep_duration.as_millis() * u128::from(self.config.attempts) / 1000,
                transaction_hash
            ))),
        }
    }

    async fn wait_for_confirmations(
        &self,
        transaction_hash: &str,
        receipt: TransactionReceipt,
    ) -> Result<TransactionReceipt, CallError> {
        let required = self.config.confirmation_blocks;
        if required == 0 {
            return Ok(receipt);
        }
        debug!(
            "Receipt for {} found in block {}, waiting for {} confirmations",
            transaction_hash, receipt.block_number, required
        );

        for _ in 0..required {
            let latest = self.source.block_number().await?;
            if latest.saturating_sub(receipt.block_number) >= required {
                info!("Transaction {} confirmed at block {}", transaction_hash, latest);
                return Ok(receipt);
            }
            tokio::time::sleep(self.config.block_time).await;
        }

        let latest = self.source.block_number().await?;
        if latest.saturating_sub(receipt.block_number) >= required {
            return Ok(receipt);
        }
        Err(CallError::timeout(format!(
            "Transaction receipt was generated but could not get enough confirmation blocks after {} seconds for transaction: {}",
            self.config.block_time.as_millis() * u128::from(required) / 1000,
            transaction_hash
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn fast(attempts: u32, confirmation_blocks: u64) -> PollingConfig {
        PollingConfig {
            sleep_duration: Duration::from_millis(1),
            attempts,
            confirmation_blocks,
            block_time: Duration::from_millis(1),
        }
    }

    fn receipt(block_number: u64) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: "0xtx".to_string(),
            block_hash: "0xblock".to_string(),
            block_number,
            status: Some("0x1".to_string()),
            contract_address: None,
        }
    }

    #[tokio::test]
    async fn test_receipt_after_pending_polls() {
        let mut source = MockReceiptSource::new();
        let mut seq = Sequence::new();
        source
            .expect_transaction_receipt()
            .with(eq("0xtx"))
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        source
            .expect_transaction_receipt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(receipt(10))));

        let processor = PollingReceiptProcessor::new(Arc::new(source), fast(5, 0));
        assert_eq!(processor.wait_for_receipt("0xtx").await.unwrap().block_number, 10);
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out() {
        let mut source = MockReceiptSource::new();
        source.expect_transaction_receipt().times(4).returning(|_| Ok(None));

        let config = PollingConfig {
            sleep_duration: Duration::from_millis(1),
            ..fast(3, 0)
        };
        let processor = PollingReceiptProcessor::new(Arc::new(source), config);
        let err = processor.wait_for_receipt("0xtx").await.unwrap_err();
        assert!(matches!(err, CallError::Timeout { .. }));
        assert!(err
            .to_string()
            .contains("Transaction receipt was not generated after 0 seconds for transaction: 0xtx"));
    }

    #[tokio::test]
    async fn test_waits_for_confirmation_blocks() {
        let mut source = MockReceiptSource::new();
        source.expect_transaction_receipt().returning(|_| Ok(Some(receipt(10))));
        let mut seq = Sequence::new();
        source
            .expect_block_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(11));
        source
            .expect_block_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(13));

        let processor = PollingReceiptProcessor::new(Arc::new(source), fast(1, 3));
        assert_eq!(processor.wait_for_receipt("0xtx").await.unwrap(), receipt(10));
    }

    #[tokio::test]
    async fn test_insufficient_confirmations_time_out() {
        let mut source = MockReceiptSource::new();
        source.expect_transaction_receipt().returning(|_| Ok(Some(receipt(10))));
        source.expect_block_number().returning(|| Ok(10));

        let processor = PollingReceiptProcessor::new(Arc::new(source), fast(1, 2));
        let err = processor.wait_for_receipt("0xtx").await.unwrap_err();
        assert!(err
            .to_string()
            .contains("could not get enough confirmation blocks after 0 seconds for transaction: 0xtx"));
    }

    #[test]
    fn test_receipt_status() {
        assert!(receipt(1).is_status_ok());
        let failed = TransactionReceipt {
            status: Some("0x0".to_string()),
            ..receipt(1)
        };
        assert!(matches!(
            failed.ensure_success(),
            Err(CallError::TransactionFailed { status }) if status == "0x0"
        ));
        let legacy = TransactionReceipt { status: None, ..receipt(1) };
        assert!(legacy.ensure_success().is_ok());
    }
}
