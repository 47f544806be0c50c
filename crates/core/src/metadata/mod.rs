//! The binding model: immutable descriptions of a contract's methods and events.
//!
//! Every binding is generic over a [`Chain`] which contributes the chain
//! specific parts (ABI entries, chaincode descriptors, deployment state).

mod address;
mod contract;
mod event;
mod method;

pub use address::DeploymentAddress;
pub use contract::ContractBinding;
pub use event::{EventBinding, EventFieldBinding, EventParameterBinding};
pub use method::{MethodBinding, ParameterBinding};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Bounds shared by all chain specific binding data.
pub trait ChainData: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> ChainData for T where T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A blockchain family a binding targets.
pub trait Chain: Clone + fmt::Debug + Default + Send + Sync + 'static {
    /// Short chain name used in logs and tooling.
    const NAME: &'static str;

    /// Contract level data, including deployment state.
    type Contract: ChainData;
    /// Per method schema data.
    type Method: ChainData;
    /// Per parameter schema data.
    type Parameter: ChainData;
    /// Per event schema data.
    type Event: ChainData;
    /// Per event field schema data.
    type EventField: ChainData;
}

/// Positions of special arguments within a call's raw argument list.
pub trait SpecialArguments {
    /// Special argument tags in parameter order, `None` for contract arguments.
    fn special_tags(&self) -> Vec<Option<&str>>;

    /// Position of the parameter tagged `tag`, compared case-insensitively.
    fn special_argument_index(&self, tag: &str) -> Option<usize> {
        self.special_tags()
            .iter()
            .position(|t| t.map_or(false, |t| t.eq_ignore_ascii_case(tag)))
    }
}
