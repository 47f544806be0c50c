//! Hyperledger Fabric specific binding data.

use chainbind_core::{Chain, ContractBinding};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Marker for Hyperledger Fabric bindings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fabric;

/// Language a chaincode is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaincodeLanguage {
    /// Not configured; installation falls back to Go.
    #[default]
    Undefined,
    /// Go chaincode, packaged below `src/<path>`.
    Go,
    /// Java chaincode.
    Java,
    /// Node.js chaincode.
    Node,
}

impl fmt::Display for ChaincodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChaincodeLanguage::Undefined => "Undefined",
            ChaincodeLanguage::Go => "Go",
            ChaincodeLanguage::Java => "Java",
            ChaincodeLanguage::Node => "Node",
        };
        f.write_str(name)
    }
}

/// Name, version and (for Go) import path of a chaincode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaincodeId {
    /// Chaincode name.
    pub name: String,
    /// Chaincode version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Go import path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ChaincodeId {
    /// A chaincode id without path.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, version: V) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            path: None,
        }
    }

    /// Sets the Go import path.
    pub fn with_path<P: Into<String>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ChaincodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// Names of the peers a chaincode has reached.
///
/// Filled in by successful install and instantiate operations on an otherwise
/// immutable binding.
#[derive(Default)]
pub struct PeerSet(RwLock<BTreeSet<String>>);

impl PeerSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer.
    pub fn insert<S: Into<String>>(&self, peer: S) {
        self.0.write().insert(peer.into());
    }

    /// Replaces the content.
    pub fn replace<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.0.write() = peers.into_iter().map(Into::into).collect();
    }

    /// Whether `peer` is in the set.
    pub fn contains(&self, peer: &str) -> bool {
        self.0.read().contains(peer)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Sorted copy of the peer names.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.read().iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PeerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(RwLock::new(iter.into_iter().map(Into::into).collect()))
    }
}

impl Clone for PeerSet {
    fn clone(&self) -> Self {
        Self(RwLock::new(self.0.read().clone()))
    }
}

impl fmt::Debug for PeerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.read().iter()).finish()
    }
}

impl PartialEq for PeerSet {
    fn eq(&self, other: &Self) -> bool {
        self.to_vec() == other.to_vec()
    }
}

impl Serialize for PeerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PeerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(RwLock::new(BTreeSet::deserialize(deserializer)?)))
    }
}

/// Contract level data of a chaincode binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricContract {
    /// Chaincode the binding talks to.
    pub chaincode_id: ChaincodeId,
    /// Chaincode language.
    #[serde(default)]
    pub language: ChaincodeLanguage,
    /// Endorsement policy document used on instantiation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Directory holding the chaincode sources for installation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_directory: Option<PathBuf>,
    /// Peers used when a call names none; empty means every channel peer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_peers: Vec<String>,
    /// Peers the chaincode is installed on.
    #[serde(default)]
    pub installed_on: PeerSet,
    /// Peers the chaincode is instantiated on.
    #[serde(default)]
    pub instantiated_on: PeerSet,
}

impl FabricContract {
    /// Contract data for a chaincode with every optional part unset.
    pub fn new(chaincode_id: ChaincodeId) -> Self {
        Self {
            chaincode_id,
            language: ChaincodeLanguage::Undefined,
            policy: None,
            source_directory: None,
            target_peers: Vec::new(),
            installed_on: PeerSet::new(),
            instantiated_on: PeerSet::new(),
        }
    }
}

/// How a bound method reaches the chaincode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FabricMethodKind {
    /// Installs the chaincode on peers.
    Install,
    /// Instantiates the chaincode on the channel.
    Instantiate,
    /// Evaluates a function without ordering.
    Query,
    /// Submits a transaction.
    Invoke,
}

/// Schema data of a chaincode method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricMethod {
    /// Operation the method maps to.
    pub kind: FabricMethodKind,
}

/// Position of a contract argument among the chaincode arguments; special
/// arguments have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricParameter {
    /// Argument position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Schema data of a chaincode event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricEvent {
    /// Event object field receiving the payload.
    pub payload_field: String,
}

/// Whether an event field receives the chaincode event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricEventField {
    /// Set on the single field the payload is written to.
    pub from_payload: bool,
}

impl Chain for Fabric {
    const NAME: &'static str = "fabric";
    type Contract = FabricContract;
    type Method = FabricMethod;
    type Parameter = FabricParameter;
    type Event = FabricEvent;
    type EventField = FabricEventField;
}

/// Chaincode data of a built binding.
pub fn contract_info(binding: &ContractBinding<Fabric>) -> &FabricContract {
    binding.chain()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_json_shape() {
        let mut contract = FabricContract::new(ChaincodeId::new("asset", "1.0").with_path("github.com/asset"));
        contract.language = ChaincodeLanguage::Go;
        contract.target_peers = vec!["peer0.org1.example.com".to_string()];
        contract.installed_on.insert("peer0.org1.example.com");

        let json = serde_json::to_value(&contract).unwrap();
        assert_eq!(json["chaincodeId"]["name"], "asset");
        assert_eq!(json["language"], "Go");
        assert_eq!(json["installedOn"][0], "peer0.org1.example.com");
        assert!(json.get("policy").is_none());

        let parsed: FabricContract = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, contract);
    }

    #[test]
    fn test_peer_set_is_shared_through_references_only() {
        let peers = PeerSet::new();
        peers.insert("b");
        peers.insert("a");
        let snapshot = peers.clone();
        peers.replace(["c"]);

        assert_eq!(snapshot.to_vec(), vec!["a", "b"]);
        assert_eq!(peers.to_vec(), vec!["c"]);
        assert!(peers.contains("c"));
    }

    #[test]
    fn test_chaincode_id_display() {
        assert_eq!(ChaincodeId::new("asset", "2").to_string(), "asset:2");
    }
}
