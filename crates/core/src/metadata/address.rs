use crate::error::DeploymentError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Deployment address of a contract, settable exactly once.
#[derive(Default)]
pub struct DeploymentAddress(OnceCell<String>);

impl DeploymentAddress {
    /// An address that is not yet known.
    pub fn unset() -> Self {
        Self(OnceCell::new())
    }

    /// An address known up front.
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self(OnceCell::with_value(address.into()))
    }

    /// The address, if set.
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str).filter(|a| !a.is_empty())
    }

    /// Whether an address is set.
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Records the address of a successful deployment.
    pub fn set<S: Into<String>>(&self, contract: &str, address: S) -> Result<(), DeploymentError> {
        self.0
            .set(address.into())
            .map_err(|_| DeploymentError::address_already_set(contract))
    }
}

impl Clone for DeploymentAddress {
    fn clone(&self) -> Self {
        match self.0.get() {
            Some(address) => Self::new(address.clone()),
            None => Self::unset(),
        }
    }
}

impl fmt::Debug for DeploymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(address) => write!(f, "DeploymentAddress({})", address),
            None => write!(f, "DeploymentAddress(unset)"),
        }
    }
}

impl PartialEq for DeploymentAddress {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Serialize for DeploymentAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeploymentAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(address) if !address.is_empty() => Self::new(address),
            _ => Self::unset(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_set_once() {
        let address = DeploymentAddress::unset();
        assert!(!address.is_set());
        address.set("Greeter", "0xabc").unwrap();
        assert_eq!(address.get(), Some("0xabc"));
        assert!(matches!(
            address.set("Greeter", "0xdef"),
            Err(DeploymentError::AddressAlreadySet { .. })
        ));
        assert_eq!(address.get(), Some("0xabc"));
    }

    #[test]
    fn test_address_serializes_as_optional_string() {
        let unset = serde_json::to_string(&DeploymentAddress::unset()).unwrap();
        assert_eq!(unset, "null");
        let set: DeploymentAddress = serde_json::from_str("\"0x01\"").unwrap();
        assert_eq!(set.get(), Some("0x01"));
    }
}
