//! Builder of Quorum contract bindings.

use crate::metadata::{Quorum, QuorumContract};
use chainbind_core::{BuildError, ContractBinding, ContractInterface};
use chainbind_ethereum::EthereumContractBuilder;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Builds a Quorum binding.
///
/// ABI, binary, address and the member builders are reached through [`Deref`]
/// to [`EthereumContractBuilder`].
#[derive(Debug)]
pub struct QuorumContractBuilder {
    inner: EthereumContractBuilder<Quorum>,
    private_for: Vec<String>,
}

impl QuorumContractBuilder {
    /// Creates a builder for `interface`.
    pub fn new(interface: ContractInterface) -> Result<Self, BuildError> {
        Ok(Self {
            inner: EthereumContractBuilder::new(interface)?,
            private_for: Vec::new(),
        })
    }

    /// Sets the default private transaction recipients.
    pub fn private_for<I, S>(&mut self, recipients: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private_for = recipients.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the binding.
    pub fn build(&mut self) -> Result<Arc<ContractBinding<Quorum>>, BuildError> {
        let private_for = self.private_for.clone();
        self.inner
            .build_with(|ethereum| QuorumContract { ethereum, private_for })
    }
}

impl Deref for QuorumContractBuilder {
    type Target = EthereumContractBuilder<Quorum>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for QuorumContractBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
