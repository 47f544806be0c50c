//! # Chainbind Fabric
//!
//! Chaincode bindings for Hyperledger Fabric.
//!
//! Chaincode functions take and return strings, so every argument is turned
//! into its text form and every payload parsed back through the string
//! converters of [`converter`]. [`FabricContractBuilder`] binds the methods
//! of an interface to chaincode functions; `install` and `instantiate` are
//! special methods deploying the chaincode. [`FabricHandler`] executes
//! dispatched calls through a [`FabricContractApi`], normally a
//! [`ChannelContractApi`] wrapping the channel of the Fabric SDK in use.
//!
//! ## Example
//!
//! ```rust
//! use chainbind_fabric::ChaincodeId;
//!
//! let id = ChaincodeId::new("assets", "1.0").with_path("github.com/assets");
//! assert_eq!(id.to_string(), "assets:1.0");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// The contract API the dispatcher talks to
pub mod api;
/// Binding builder
pub mod builder;
/// Channel collaborator and proposal handling
pub mod channel;
/// String conversion of arguments and payloads
pub mod converter;
/// Shared chaincode event listeners
pub mod events;
/// Call execution
pub mod handler;
/// Chain specific binding data
pub mod metadata;
/// Validation of bindings against chaincode rules
pub mod schema;
/// Special method and argument names
pub mod special;
/// Signing identities
pub mod user;

pub use api::{ChaincodeEvent, ChaincodeEventStream, FabricContractApi, ProposalOptions};
pub use builder::FabricContractBuilder;
pub use channel::{ChannelContractApi, FabricChannel, Peer, ProposalResponse, ProposalStatus};
pub use converter::{FabricArgumentConverter, StringConverter};
pub use events::ChaincodeEventHub;
pub use handler::FabricHandler;
pub use metadata::{contract_info, ChaincodeId, ChaincodeLanguage, Fabric, FabricContract};
pub use schema::ChaincodeSchema;
pub use user::{Enrollment, EnrollmentError, FabricUser};
