//! # Chainbind Quorum
//!
//! Quorum follows the Ethereum ABI, so bindings are resolved and converted by
//! `chainbind-ethereum`. This crate adds the private transaction recipients:
//! a default list stored with the contract and a `privateFor` special
//! argument overriding it per call.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Binding builder
pub mod builder;
/// Call execution
pub mod handler;
/// Chain specific binding data
pub mod metadata;

pub use builder::QuorumContractBuilder;
pub use handler::{QuorumHandler, PRIVATE_FOR};
pub use metadata::{private_for, Quorum, QuorumContract};
