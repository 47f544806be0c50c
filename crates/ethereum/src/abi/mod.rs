//! Contract ABI documents, type strings and wire values.

mod types;
mod value;

pub use types::AbiType;
pub use value::AbiValue;

use chainbind_core::BuildError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use tracing::debug;

const DATA_LOCATIONS: [&str; 3] = ["storage", "memory", "calldata"];

/// Kind of an ABI entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiEntryKind {
    /// A contract function; entries without a type are functions.
    #[default]
    Function,
    /// The constructor.
    Constructor,
    /// An event.
    Event,
    /// The fallback function.
    Fallback,
    /// The receive function.
    Receive,
    /// Any other entry, e.g. custom errors.
    #[serde(other)]
    Other,
}

/// A typed, named input or output of an ABI entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    /// Parameter name, may be empty.
    #[serde(default)]
    pub name: String,
    /// Solidity type string.
    #[serde(rename = "type")]
    pub ty: String,
    /// Whether the event parameter is indexed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub indexed: bool,
}

impl NamedType {
    /// A non-indexed parameter.
    pub fn new<N: Into<String>, T: Into<String>>(name: N, ty: T) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            indexed: false,
        }
    }

    /// Marks the parameter as indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// The type string without a data location.
    pub fn solidity_type(&self) -> &str {
        strip_location(&self.ty)
    }
}

/// One entry of a contract ABI document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiDefinition {
    /// Entry kind.
    #[serde(rename = "type", default)]
    pub kind: AbiEntryKind,
    /// Function or event name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Inputs, or event parameters.
    #[serde(default)]
    pub inputs: Vec<NamedType>,
    /// Function outputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<NamedType>,
    /// `pure`, `view`, `nonpayable` or `payable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
    /// Legacy read-only flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
    /// Legacy payable flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,
    /// Whether an event omits its signature topic.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub anonymous: bool,
}

impl AbiDefinition {
    /// A function entry.
    pub fn function<S: Into<String>>(name: S, inputs: Vec<NamedType>, outputs: Vec<NamedType>) -> Self {
        Self::entry(AbiEntryKind::Function, Some(name.into()), inputs, outputs)
    }

    /// A constructor entry.
    pub fn constructor(inputs: Vec<NamedType>) -> Self {
        Self::entry(AbiEntryKind::Constructor, None, inputs, Vec::new())
    }

    /// An event entry.
    pub fn event<S: Into<String>>(name: S, inputs: Vec<NamedType>) -> Self {
        Self::entry(AbiEntryKind::Event, Some(name.into()), inputs, Vec::new())
    }

    fn entry(kind: AbiEntryKind, name: Option<String>, inputs: Vec<NamedType>, outputs: Vec<NamedType>) -> Self {
        Self {
            kind,
            name,
            inputs,
            outputs,
            state_mutability: None,
            constant: None,
            payable: None,
            anonymous: false,
        }
    }

    /// Entry name, empty for constructors and fallbacks.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Whether the entry has the given kind and a case-insensitively equal name.
    pub fn matches(&self, kind: AbiEntryKind, name: &str) -> bool {
        self.kind == kind && self.name().eq_ignore_ascii_case(name)
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(NamedType::solidity_type).collect();
        format!("{}({})", self.name(), types.join(","))
    }

    /// `0x` prefixed keccak256 hash of the signature; the first topic of event logs.
    pub fn topic(&self) -> String {
        format!("0x{}", hex::encode(keccak256(self.signature().as_bytes())))
    }
}

/// Parses a JSON ABI document.
pub fn parse_abi(json: &str) -> Result<Vec<AbiDefinition>, BuildError> {
    serde_json::from_str(json).map_err(|e| {
        debug!("Contract ABI is not valid JSON: {}", e);
        BuildError::invalid_argument(format!("Failed to parse contract abi! {}", e))
    })
}

/// Drops a trailing data location such as ` memory` from a type string.
pub fn strip_location(ty: &str) -> &str {
    let ty = ty.trim();
    match ty.rsplit_once(' ') {
        Some((base, location)) if DATA_LOCATIONS.contains(&location) => base.trim_end(),
        _ => ty,
    }
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Prefixes an address with `0x` unless it already has one.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("0x") || address.starts_with("0X") {
        address.to_string()
    } else {
        format!("0x{}", address)
    }
}
