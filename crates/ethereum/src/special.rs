//! Special method and special argument names understood by ABI chains.

/// Special method deploying the contract.
pub const DEPLOYMENT_METHOD: &str = "deploy";

/// Gas price of a transaction.
pub const GAS_PRICE: &str = "gasPrice";

/// Gas limit of a transaction.
pub const GAS_LIMIT: &str = "gasLimit";

/// Wei sent along with a transaction.
pub const VALUE: &str = "value";

/// First block of an event subscription.
pub const FROM_BLOCK: &str = "fromBlock";

/// Last block of an event subscription.
pub const TO_BLOCK: &str = "toBlock";
