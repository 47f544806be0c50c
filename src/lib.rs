//! # Chainbind: typed smart-contract bindings
//!
//! Declare a contract interface once and call it on Ethereum, Quorum or
//! Hyperledger Fabric. A chain specific builder resolves every method,
//! parameter and event of a [`ContractInterface`](core::ContractInterface)
//! against the contract's schema and yields a serializable binding; a
//! [`MethodDispatcher`](core::MethodDispatcher) turns method invocations into
//! queries, transactions, deployments or event subscriptions.
//!
//! ## Architecture
//!
//! - [`core`] - binding model, type conversion registry, builder, dispatcher and registries
//! - [`ethereum`] - Ethereum ABI bindings (feature `ethereum`)
//! - [`quorum`] - Quorum bindings with private transactions (feature `quorum`)
//! - [`fabric`] - Fabric chaincode bindings (feature `fabric`)
//! - [`config`] - TOML settings and logging
//!
//! ## Quick Start
//!
//! ```rust
//! use chainbind::prelude::*;
//!
//! let interface = ContractInterface::new("Greeter").method(MethodSignature::new(
//!     "greet",
//!     vec![ParameterSignature::new("name", NativeType::String)],
//!     ReturnSignature::of(NativeType::String),
//! ));
//! assert_eq!(MethodId::new("greet", &[NativeType::String]).to_string(), "greet(String)");
//! # let _ = interface;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use chainbind_config as config;
pub use chainbind_core as core;

#[cfg(feature = "ethereum")]
pub use chainbind_ethereum as ethereum;

#[cfg(feature = "quorum")]
pub use chainbind_quorum as quorum;

#[cfg(feature = "fabric")]
pub use chainbind_fabric as fabric;

use chainbind_config::{RegistryProvider, RegistrySettings};
use chainbind_core::{Chain, ContractRegistry, FileSystemContractRegistry, InMemoryContractRegistry, RegistryError};

/// Opens the registry selected by the settings and loads its bindings.
pub fn open_registry<C: Chain>(settings: &RegistrySettings) -> Result<Box<dyn ContractRegistry<C>>, RegistryError> {
    match settings.provider {
        RegistryProvider::Filesystem => Ok(Box::new(FileSystemContractRegistry::<C>::open(&settings.base_path)?)),
        RegistryProvider::Memory => Ok(Box::new(InMemoryContractRegistry::<C>::new())),
    }
}

/// Receipt polling of the Ethereum settings.
#[cfg(feature = "ethereum")]
pub fn polling_config(settings: &chainbind_config::PollingSettings) -> chainbind_ethereum::PollingConfig {
    chainbind_ethereum::PollingConfig {
        sleep_duration: settings.sleep_duration(),
        attempts: settings.attempts,
        confirmation_blocks: settings.confirmation_blocks,
        block_time: settings.block_time(),
    }
}

/// The Fabric user of the settings, enrolled from its PEM files.
///
/// `None` when no user name is configured.
#[cfg(feature = "fabric")]
pub fn fabric_user(
    settings: &chainbind_config::FabricUserSettings,
) -> Result<Option<chainbind_fabric::FabricUser>, chainbind_fabric::EnrollmentError> {
    let Some(name) = &settings.name else {
        return Ok(None);
    };
    let enrollment = match (&settings.certificate_file, &settings.private_key_file) {
        (Some(certificate), Some(private_key)) => {
            Some(chainbind_fabric::Enrollment::from_pem_files(certificate, private_key)?)
        }
        _ => None,
    };
    Ok(Some(chainbind_fabric::FabricUser {
        name: name.clone(),
        msp_id: settings.msp_id.clone().unwrap_or_default(),
        roles: settings.roles.iter().cloned().collect(),
        account: settings.account.clone(),
        affiliation: settings.affiliation.clone(),
        enrollment,
    }))
}

/// Common imports for chainbind development
pub mod prelude {
    pub use chainbind_core::prelude::*;
    pub use chainbind_core::{CallError, ContractBinding, MethodBinding};

    #[cfg(feature = "ethereum")]
    pub use chainbind_ethereum::{EthereumContractBuilder, EthereumHandler, Web3ContractApi};

    #[cfg(feature = "quorum")]
    pub use chainbind_quorum::{QuorumContractBuilder, QuorumHandler};

    #[cfg(feature = "fabric")]
    pub use chainbind_fabric::{ChannelContractApi, FabricChannel, FabricContractApi, FabricContractBuilder, FabricHandler};
}
