//! Builder of ABI chain contract bindings.

use crate::abi::{parse_abi, AbiDefinition};
use crate::metadata::{AbiChain, Ethereum, EthereumContract};
use crate::schema::AbiSchema;
use crate::special::DEPLOYMENT_METHOD;
use chainbind_core::builder::MethodBindingBuilder;
use chainbind_core::{BuildError, ContractBinding, ContractBindingBuilder, ContractInterface, DeploymentAddress, NativeType};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Builds a binding for a contract described by an ABI.
///
/// Method and event builders are reached through [`Deref`] to the generic
/// [`ContractBindingBuilder`].
#[derive(Debug)]
pub struct EthereumContractBuilder<C: AbiChain = Ethereum> {
    bindings: ContractBindingBuilder<C>,
    abi: Option<Vec<AbiDefinition>>,
    binary: Option<String>,
    address: Option<String>,
}

impl<C: AbiChain> EthereumContractBuilder<C> {
    /// Creates a builder for `interface`.
    pub fn new(interface: ContractInterface) -> Result<Self, BuildError> {
        Ok(Self {
            bindings: ContractBindingBuilder::new(interface)?,
            abi: None,
            binary: None,
            address: None,
        })
    }

    /// Sets the ABI from its JSON form.
    pub fn with_abi(&mut self, json: &str) -> Result<&mut Self, BuildError> {
        self.abi = Some(parse_abi(json)?);
        Ok(self)
    }

    /// Sets already parsed ABI entries.
    pub fn with_abi_definitions(&mut self, abi: Vec<AbiDefinition>) -> &mut Self {
        self.abi = Some(abi);
        self
    }

    /// Reads the ABI from a JSON file.
    pub fn with_abi_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, BuildError> {
        let json = read_artifact(path.as_ref())?;
        self.with_abi(&json)
    }

    /// Sets the hex encoded contract binary used for deployment.
    pub fn with_binary<S: Into<String>>(&mut self, binary: S) -> &mut Self {
        self.binary = Some(binary.into().trim().to_string());
        self
    }

    /// Reads the contract binary from a file.
    pub fn with_binary_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, BuildError> {
        let binary = read_artifact(path.as_ref())?;
        Ok(self.with_binary(binary))
    }

    /// Binds to an already deployed contract.
    pub fn at_address<S: Into<String>>(&mut self, address: S) -> &mut Self {
        self.address = Some(address.into());
        self
    }

    /// Declares the deployment method; its arguments are passed to the constructor.
    pub fn deployment_method(
        &mut self,
        name: &str,
        parameter_types: &[NativeType],
    ) -> Result<&mut MethodBindingBuilder<C>, BuildError> {
        let method = self.bindings.method(name, parameter_types)?;
        method.name(DEPLOYMENT_METHOD).special_method(true);
        Ok(method)
    }

    /// Builds the binding, wrapping the ABI contract data with `contract`.
    pub fn build_with<F>(&mut self, contract: F) -> Result<Arc<ContractBinding<C>>, BuildError>
    where
        F: FnOnce(EthereumContract) -> C::Contract,
    {
        let abi = self
            .abi
            .clone()
            .filter(|abi| !abi.is_empty())
            .ok_or_else(|| BuildError::missing_schema("ABI", "Contract ABI must not be null or empty!"))?;
        let schema = AbiSchema::new(abi.clone());
        let info = EthereumContract {
            address: self
                .address
                .clone()
                .map(DeploymentAddress::new)
                .unwrap_or_default(),
            abi,
            binary: self.binary.clone().filter(|b| !b.is_empty()),
        };
        debug!(
            "Building {} binding for '{}' ({} ABI entries)",
            C::NAME,
            self.bindings.interface().name,
            schema.definitions().len()
        );
        self.bindings.build(&schema, contract(info))
    }
}

impl EthereumContractBuilder<Ethereum> {
    /// Builds the binding.
    pub fn build(&mut self) -> Result<Arc<ContractBinding<Ethereum>>, BuildError> {
        self.build_with(|contract| contract)
    }
}

impl<C: AbiChain> Deref for EthereumContractBuilder<C> {
    type Target = ContractBindingBuilder<C>;

    fn deref(&self) -> &Self::Target {
        &self.bindings
    }
}

impl<C: AbiChain> DerefMut for EthereumContractBuilder<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bindings
    }
}

fn read_artifact(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path)
        .map_err(|e| BuildError::invalid_argument(format!("Failed to read '{}': {}", path.display(), e)))
}
