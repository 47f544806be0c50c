//! Special method and special argument names understood by Fabric bindings.

/// Special method installing the chaincode on peers.
pub const INSTALL_METHOD: &str = "install";

/// Special method instantiating the chaincode on the channel.
pub const INSTANTIATE_METHOD: &str = "instantiate";

/// Chaincode function called on instantiation.
pub const INIT_FUNCTION: &str = "init";

/// Names of the peers a call is sent to.
pub const TARGET_PEERS: &str = "targetPeers";

/// User the proposal is signed as.
pub const USER: &str = "user";
