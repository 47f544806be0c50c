//! Channel collaborator and the contract API built on top of it.
//!
//! [`FabricChannel`] is the seam to a Fabric SDK: it signs and sends proposals,
//! submits endorsed transactions and delivers chaincode events.
//! [`ChannelContractApi`] adds target peer selection, endorsement consistency
//! checks and shared event listeners.

use crate::api::{ChaincodeEvent, ChaincodeEventStream, FabricContractApi, ProposalOptions};
use crate::events::ChaincodeEventHub;
use crate::metadata::{ChaincodeId, ChaincodeLanguage, FabricContract};
use crate::special::INIT_FUNCTION;
use crate::user::FabricUser;
use async_trait::async_trait;
use chainbind_core::{CallError, CallResult, DeploymentError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// A peer of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    /// Peer name, as used for target peer selection.
    pub name: String,
    /// Peer address.
    pub url: String,
}

impl Peer {
    /// Creates a peer.
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Endorsement status reported by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    /// The proposal was endorsed.
    Success,
    /// The peer refused or failed to endorse.
    Failure,
}

/// Answer of one peer to a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResponse {
    /// Responding peer.
    pub peer: Peer,
    /// Endorsement status.
    pub status: ProposalStatus,
    /// Peer message, set on failures.
    pub message: String,
    /// Chaincode response payload.
    pub payload: Vec<u8>,
}

impl ProposalResponse {
    /// Whether the peer endorsed the proposal.
    pub fn is_valid(&self) -> bool {
        self.status == ProposalStatus::Success
    }
}

/// Installs chaincode sources on peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProposal {
    /// Chaincode to install.
    pub chaincode_id: ChaincodeId,
    /// Chaincode language.
    pub language: ChaincodeLanguage,
    /// Directory holding the chaincode sources.
    pub source_directory: PathBuf,
    /// Path the sources are placed below in the package, `src/<path>` for Go.
    pub path_prefix: Option<PathBuf>,
}

/// Instantiates an installed chaincode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateProposal {
    /// Chaincode to instantiate.
    pub chaincode_id: ChaincodeId,
    /// Chaincode language.
    pub language: ChaincodeLanguage,
    /// Endorsement policy document.
    pub policy: String,
    /// Function run on instantiation.
    pub function: String,
    /// Arguments of `function`.
    pub arguments: Vec<String>,
}

/// Invokes or queries a chaincode function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeProposal {
    /// Target chaincode.
    pub chaincode_id: ChaincodeId,
    /// Function name.
    pub function: String,
    /// Function arguments.
    pub arguments: Vec<String>,
}

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    /// Transaction id.
    pub transaction_id: String,
    /// Hash of the block holding the transaction.
    pub block_hash: Option<String>,
}

/// Identifies a registered chaincode event listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub String);

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives chaincode events, or the error that ended the listener.
pub type ChaincodeEventSink = Arc<dyn Fn(Result<ChaincodeEvent, CallError>) + Send + Sync>;

/// A Fabric channel as provided by the SDK in use.
///
/// A `None` user signs with the client's current user context. Peers are
/// always passed explicitly; names are matched exactly.
#[async_trait]
pub trait FabricChannel: Send + Sync {
    /// Peers known to the channel.
    fn peers(&self) -> Vec<Peer>;

    /// Sends an install proposal.
    async fn send_install_proposal(
        &self,
        proposal: InstallProposal,
        peers: &[Peer],
        user: Option<&FabricUser>,
    ) -> Result<Vec<ProposalResponse>, CallError>;

    /// Sends an instantiate proposal.
    async fn send_instantiate_proposal(
        &self,
        proposal: InstantiateProposal,
        peers: &[Peer],
        user: Option<&FabricUser>,
    ) -> Result<Vec<ProposalResponse>, CallError>;

    /// Sends a transaction proposal for endorsement.
    async fn send_transaction_proposal(
        &self,
        proposal: ChaincodeProposal,
        peers: &[Peer],
        user: Option<&FabricUser>,
    ) -> Result<Vec<ProposalResponse>, CallError>;

    /// Evaluates a function without submitting a transaction.
    async fn query_by_chaincode(
        &self,
        proposal: ChaincodeProposal,
        peers: &[Peer],
        user: Option<&FabricUser>,
    ) -> Result<Vec<ProposalResponse>, CallError>;

    /// Submits endorsed responses to the orderer and waits for the commit.
    async fn send_transaction(
        &self,
        responses: Vec<ProposalResponse>,
        user: Option<&FabricUser>,
    ) -> Result<TransactionEvent, CallError>;

    /// Registers a listener for `event_name` events of `chaincode`.
    ///
    /// The sink must not be invoked before this call returns.
    fn register_chaincode_listener(
        &self,
        chaincode: &str,
        event_name: &str,
        sink: ChaincodeEventSink,
    ) -> Result<ListenerHandle, CallError>;

    /// Removes a listener.
    fn unregister_chaincode_listener(&self, handle: &ListenerHandle) -> Result<(), CallError>;
}

/// [`FabricContractApi`] over a [`FabricChannel`].
pub struct ChannelContractApi {
    channel: Arc<dyn FabricChannel>,
    hubs: Mutex<HashMap<(String, String), Weak<ChaincodeEventHub>>>,
}

impl ChannelContractApi {
    /// Creates the API for `channel`.
    pub fn new(channel: Arc<dyn FabricChannel>) -> Self {
        Self {
            channel,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &Arc<dyn FabricChannel> {
        &self.channel
    }

    /// Number of event hubs with at least one open stream.
    pub fn event_hub_count(&self) -> usize {
        let mut hubs = self.hubs.lock();
        hubs.retain(|_, hub| hub.strong_count() > 0);
        hubs.len()
    }

    fn target_peers(&self, names: Option<&[String]>) -> Result<Vec<Peer>, CallError> {
        let peers = self.channel.peers();
        let names = match names {
            Some(names) if !names.is_empty() => names,
            _ => return Ok(peers),
        };
        let selected: Vec<Peer> = peers.into_iter().filter(|peer| names.contains(&peer.name)).collect();
        if selected.is_empty() {
            return Err(CallError::invalid_call(
                "Cannot call function, the specified target peer addresses didn't match any of the channels known addresses",
            ));
        }
        Ok(selected)
    }

    async fn endorse(
        &self,
        contract: &FabricContract,
        function: &str,
        arguments: Vec<String>,
        options: &ProposalOptions,
        submit: bool,
    ) -> Result<Vec<ProposalResponse>, CallError> {
        let peers = self.target_peers(options.target_peers.as_deref())?;
        let proposal = ChaincodeProposal {
            chaincode_id: contract.chaincode_id.clone(),
            function: function.to_string(),
            arguments,
        };
        let user = options.user.as_ref();
        let sent = if submit {
            info!(
                "Sending transaction proposal '{}' as {} to peers: {}",
                function,
                user_name(user),
                peer_names(&peers)
            );
            self.channel.send_transaction_proposal(proposal, &peers, user).await
        } else {
            info!(
                "Sending query proposal '{}' as {} to peers: {}",
                function,
                user_name(user),
                peer_names(&peers)
            );
            self.channel.query_by_chaincode(proposal, &peers, user).await
        };
        let responses = sent.map_err(|e| {
            error!("Failed to send proposal '{}' to peers: {}", function, e);
            e
        })?;
        consistent(responses)
    }
}

/// Keeps the valid responses, which must all carry the same payload.
pub fn consistent(responses: Vec<ProposalResponse>) -> Result<Vec<ProposalResponse>, CallError> {
    let total = responses.len();
    let mut sets: Vec<Vec<ProposalResponse>> = Vec::new();
    for response in responses {
        if !response.is_valid() {
            warn!("Received invalid response from peer '{}': {}", response.peer.url, response.message);
            continue;
        }
        debug!("Received valid response from peer '{}'", response.peer.url);
        let existing = sets
            .iter_mut()
            .find(|set| set.first().map_or(false, |first| first.payload == response.payload));
        match existing {
            Some(set) => set.push(response),
            None => sets.push(vec![response]),
        }
    }
    if sets.len() != 1 {
        error!("Received responses are inconsistent from peers");
        return Err(CallError::inconsistent(format!(
            "found {} consistency sets among {} responses",
            sets.len(),
            total
        )));
    }
    sets.pop()
        .ok_or_else(|| CallError::inconsistent("no endorsed response"))
}

fn payload_text(responses: &[ProposalResponse]) -> String {
    responses
        .first()
        .map(|response| String::from_utf8_lossy(&response.payload).into_owned())
        .unwrap_or_default()
}

fn peer_names(peers: &[Peer]) -> String {
    peers.iter().map(|peer| peer.name.as_str()).collect::<Vec<_>>().join(", ")
}

fn user_name(user: Option<&FabricUser>) -> String {
    match user {
        Some(user) => format!("user '{}'", user.name),
        None => "client user".to_string(),
    }
}

fn resolve_language(chaincode: &ChaincodeId, language: ChaincodeLanguage) -> ChaincodeLanguage {
    if language == ChaincodeLanguage::Undefined {
        warn!("No language set for chaincode '{}', assuming Go", chaincode);
        ChaincodeLanguage::Go
    } else {
        language
    }
}

fn check_source_directory(chaincode: &str, directory: &Path) -> Result<(), DeploymentError> {
    if !directory.exists() {
        return Err(DeploymentError::rejected(
            chaincode,
            format!("chaincode source directory '{}' does not exist", directory.display()),
        ));
    }
    if !directory.is_dir() {
        return Err(DeploymentError::rejected(
            chaincode,
            format!("chaincode source '{}' is not a directory", directory.display()),
        ));
    }
    let mut entries = std::fs::read_dir(directory).map_err(|e| {
        DeploymentError::rejected_with(
            chaincode,
            format!("cannot read chaincode source directory '{}'", directory.display()),
            e,
        )
    })?;
    if entries.next().is_none() {
        return Err(DeploymentError::rejected(
            chaincode,
            format!("chaincode source directory '{}' is empty", directory.display()),
        ));
    }
    Ok(())
}

fn install_proposal(contract: &FabricContract) -> Result<InstallProposal, DeploymentError> {
    let chaincode = contract.chaincode_id.to_string();
    if contract.chaincode_id.name.is_empty() {
        return Err(DeploymentError::missing_artifact(chaincode, "chaincode ID"));
    }
    let source_directory = contract
        .source_directory
        .clone()
        .ok_or_else(|| DeploymentError::missing_artifact(&chaincode, "chaincode source directory"))?;
    check_source_directory(&chaincode, &source_directory)?;

    let language = resolve_language(&contract.chaincode_id, contract.language);
    let path_prefix = match language {
        ChaincodeLanguage::Go | ChaincodeLanguage::Undefined => {
            let path = contract
                .chaincode_id
                .path
                .as_deref()
                .filter(|path| !path.is_empty())
                .ok_or_else(|| DeploymentError::missing_artifact(&chaincode, "path of Go chaincode"))?;
            Some(Path::new("src").join(path))
        }
        ChaincodeLanguage::Java | ChaincodeLanguage::Node => None,
    };
    Ok(InstallProposal {
        chaincode_id: contract.chaincode_id.clone(),
        language,
        source_directory,
        path_prefix,
    })
}

fn rejected_by_peers(chaincode: &str, action: &str, responses: &[ProposalResponse]) -> Result<(), DeploymentError> {
    if let Some(response) = responses.iter().find(|response| !response.is_valid()) {
        let message = format!(
            "{} proposal rejected by peer '{}': {}",
            action, response.peer.name, response.message
        );
        error!("Failed to {} chaincode '{}': {}", action.to_lowercase(), chaincode, message);
        return Err(DeploymentError::rejected(chaincode, message));
    }
    Ok(())
}

#[async_trait]
impl FabricContractApi for ChannelContractApi {
    fn chaincode_events(&self, contract: &FabricContract, event_name: &str) -> Result<ChaincodeEventStream, CallError> {
        let chaincode = contract.chaincode_id.name.clone();
        if chaincode.is_empty() {
            return Err(CallError::invalid_call("Chaincode not set in contract info"));
        }
        // Hubs live as long as their streams; dead entries are pruned here.
        let hub = {
            let mut hubs = self.hubs.lock();
            hubs.retain(|_, hub| hub.strong_count() > 0);
            let key = (chaincode.clone(), event_name.to_string());
            match hubs.get(&key).and_then(Weak::upgrade) {
                Some(hub) => hub,
                None => {
                    let hub = ChaincodeEventHub::new(Arc::clone(&self.channel), chaincode, event_name);
                    hubs.insert(key, Arc::downgrade(&hub));
                    hub
                }
            }
        };
        Ok(hub.subscribe())
    }

    async fn install(&self, contract: &FabricContract, options: ProposalOptions) -> Result<(), DeploymentError> {
        let chaincode = contract.chaincode_id.to_string();
        let proposal = install_proposal(contract)?;
        let peers = self
            .target_peers(options.target_peers.as_deref())
            .map_err(|e| DeploymentError::rejected_with(&chaincode, e.to_string(), e))?;
        let user = options.user.as_ref();
        info!(
            "Sending install proposal for chaincode '{}' as {} to peers: {}",
            chaincode,
            user_name(user),
            peer_names(&peers)
        );
        let responses = self
            .channel
            .send_install_proposal(proposal, &peers, user)
            .await
            .map_err(|e| DeploymentError::rejected_with(&chaincode, "install proposal failed", e))?;
        rejected_by_peers(&chaincode, "Install", &responses)?;

        for response in &responses {
            contract.installed_on.insert(response.peer.name.clone());
            info!("Installed chaincode '{}' on peer '{}'", chaincode, response.peer.name);
        }
        Ok(())
    }

    async fn instantiate(
        &self,
        contract: &FabricContract,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<(), DeploymentError> {
        let chaincode = contract.chaincode_id.to_string();
        if contract.chaincode_id.name.is_empty() {
            return Err(DeploymentError::missing_artifact(chaincode, "chaincode ID"));
        }
        let policy = contract
            .policy
            .clone()
            .ok_or_else(|| DeploymentError::missing_artifact(&chaincode, "endorsement policy"))?;
        let proposal = InstantiateProposal {
            chaincode_id: contract.chaincode_id.clone(),
            language: resolve_language(&contract.chaincode_id, contract.language),
            policy,
            function: INIT_FUNCTION.to_string(),
            arguments,
        };
        let peers = self
            .target_peers(options.target_peers.as_deref())
            .map_err(|e| DeploymentError::rejected_with(&chaincode, e.to_string(), e))?;
        let user = options.user.as_ref();
        info!(
            "Sending instantiate proposal for chaincode '{}' as {} to peers: {}",
            chaincode,
            user_name(user),
            peer_names(&peers)
        );
        let responses = self
            .channel
            .send_instantiate_proposal(proposal, &peers, user)
            .await
            .map_err(|e| DeploymentError::rejected_with(&chaincode, "instantiate proposal failed", e))?;
        rejected_by_peers(&chaincode, "Instantiate", &responses)?;

        let event = self
            .channel
            .send_transaction(responses, user)
            .await
            .map_err(|e| DeploymentError::rejected_with(&chaincode, "instantiate transaction failed", e))?;
        contract
            .instantiated_on
            .replace(peers.iter().map(|peer| peer.name.clone()));
        info!(
            "Instantiated chaincode '{}' in transaction {} on peers: {}",
            chaincode,
            event.transaction_id,
            peer_names(&peers)
        );
        Ok(())
    }

    async fn invoke(
        &self,
        contract: &FabricContract,
        function: &str,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<CallResult<String>, CallError> {
        let responses = self.endorse(contract, function, arguments, &options, true).await?;
        let payload = payload_text(&responses);
        let event = self
            .channel
            .send_transaction(responses, options.user.as_ref())
            .await
            .map_err(|e| {
                error!("Failed to submit transaction '{}': {}", function, e);
                e
            })?;
        info!("Received block containing transaction {}", event.transaction_id);
        Ok(CallResult {
            data: payload,
            block_hash: event.block_hash,
            transaction_hash: Some(event.transaction_id),
        })
    }

    async fn query(
        &self,
        contract: &FabricContract,
        function: &str,
        arguments: Vec<String>,
        options: ProposalOptions,
    ) -> Result<String, CallError> {
        let responses = self.endorse(contract, function, arguments, &options, false).await?;
        Ok(payload_text(&responses))
    }
}
