//! The contract API the Fabric dispatcher talks to.

use crate::metadata::FabricContract;
use crate::user::FabricUser;
use async_trait::async_trait;
use chainbind_core::{CallError, CallResult, DeploymentError};
use futures::stream::BoxStream;

/// A chaincode event as delivered by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeEvent {
    /// UTF-8 decoded event payload.
    pub payload: String,
    /// Hash of the block the event was emitted in.
    pub block_hash: Option<String>,
    /// Id of the emitting transaction.
    pub transaction_id: String,
}

/// Stream of chaincode events; an `Err` item is terminal.
pub type ChaincodeEventStream = BoxStream<'static, Result<ChaincodeEvent, CallError>>;

/// Peers and identity a proposal is sent with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalOptions {
    /// Peer names; `None` sends to every channel peer.
    pub target_peers: Option<Vec<String>>,
    /// Signing identity; `None` uses the client's current user.
    pub user: Option<FabricUser>,
}

/// Chaincode operations of one channel.
///
/// Every operation receives the contract data of the binding, so one API
/// instance serves any number of bindings on the channel.
#[async_trait]
pub trait FabricContractApi: Send + Sync {
    /// Opens a stream of the chaincode events called `event_name`.
    ///
    /// Streams opened for the same chaincode and event share one listener on
    /// the channel.
    fn chaincode_events(&self, contract: &FabricContract, event_name: &str) -> Result<ChaincodeEventStream, CallError>;

    /// Installs the chaincode and records the peers it was installed on.
    async fn install(&self, contract: &FabricContract, options: ProposalOptions) -> Result<(), DeploymentError>;

    /// Instantiates the chaincode, passing `arguments` to its `init` function,
    /// and records the peers it was instantiated on.
    async fn instantiate(
        &self,
        contract: &FabricContract,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<(), DeploymentError>;

    /// Submits a transaction and returns its payload with block and transaction ids.
    async fn invoke(
        &self,
        contract: &FabricContract,
        function: &str,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<CallResult<String>, CallError>;

    /// Evaluates a function on the target peers.
    async fn query(
        &self,
        contract: &FabricContract,
        function: &str,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<String, CallError>;
}
