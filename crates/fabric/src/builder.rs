//! Builder of chaincode bindings.

use crate::metadata::{ChaincodeId, ChaincodeLanguage, Fabric, FabricContract};
use crate::schema::ChaincodeSchema;
use crate::special::{INSTALL_METHOD, INSTANTIATE_METHOD};
use chainbind_core::builder::MethodBindingBuilder;
use chainbind_core::{BuildError, Chain, ContractBinding, ContractBindingBuilder, ContractInterface, NativeType};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Builds a binding for a chaincode.
///
/// Method and event builders are reached through [`Deref`] to the generic
/// [`ContractBindingBuilder`].
#[derive(Debug)]
pub struct FabricContractBuilder {
    bindings: ContractBindingBuilder<Fabric>,
    chaincode_id: Option<ChaincodeId>,
    language: ChaincodeLanguage,
    policy: Option<String>,
    source_directory: Option<PathBuf>,
    target_peers: Vec<String>,
}

impl FabricContractBuilder {
    /// Creates a builder for `interface`.
    pub fn new(interface: ContractInterface) -> Result<Self, BuildError> {
        Ok(Self {
            bindings: ContractBindingBuilder::new(interface)?,
            chaincode_id: None,
            language: ChaincodeLanguage::Undefined,
            policy: None,
            source_directory: None,
            target_peers: Vec::new(),
        })
    }

    /// Sets the chaincode the binding talks to.
    pub fn chaincode_id(&mut self, chaincode_id: ChaincodeId) -> &mut Self {
        self.chaincode_id = Some(chaincode_id);
        self
    }

    /// Sets the chaincode language.
    pub fn language(&mut self, language: ChaincodeLanguage) -> &mut Self {
        self.language = language;
        self
    }

    /// Sets the endorsement policy document.
    pub fn endorsement_policy<S: Into<String>>(&mut self, policy: S) -> &mut Self {
        self.policy = Some(policy.into());
        self
    }

    /// Reads the endorsement policy document from a file.
    pub fn endorsement_policy_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self, BuildError> {
        let path = path.as_ref();
        let policy = std::fs::read_to_string(path).map_err(|e| {
            BuildError::invalid_argument(format!("Failed to read endorsement policy '{}': {}", path.display(), e))
        })?;
        Ok(self.endorsement_policy(policy))
    }

    /// Sets the directory holding the chaincode sources.
    pub fn source_directory<P: Into<PathBuf>>(&mut self, directory: P) -> &mut Self {
        self.source_directory = Some(directory.into());
        self
    }

    /// Sets the peers used when a call names none.
    pub fn target_peers<I, S>(&mut self, peers: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Declares the method installing the chaincode.
    pub fn install_method(
        &mut self,
        name: &str,
        parameter_types: &[NativeType],
    ) -> Result<&mut MethodBindingBuilder<Fabric>, BuildError> {
        let method = self.bindings.method(name, parameter_types)?;
        method.name(INSTALL_METHOD).special_method(true);
        Ok(method)
    }

    /// Declares the method instantiating the chaincode; its arguments are
    /// passed to the chaincode's `init` function.
    pub fn instantiate_method(
        &mut self,
        name: &str,
        parameter_types: &[NativeType],
    ) -> Result<&mut MethodBindingBuilder<Fabric>, BuildError> {
        let method = self.bindings.method(name, parameter_types)?;
        method.name(INSTANTIATE_METHOD).special_method(true);
        Ok(method)
    }

    /// Builds the binding.
    pub fn build(&mut self) -> Result<Arc<ContractBinding<Fabric>>, BuildError> {
        let chaincode_id = self
            .chaincode_id
            .clone()
            .filter(|id| !id.name.is_empty())
            .ok_or_else(|| BuildError::missing_schema("chaincode ID", "ChaincodeID needs to be specified"))?;
        if self.binds_special(INSTALL_METHOD) && self.source_directory.is_none() {
            return Err(BuildError::missing_schema(
                "chaincode source directory",
                "An install method is bound but no chaincode source directory is set",
            ));
        }
        if self.binds_special(INSTANTIATE_METHOD) && self.policy.is_none() {
            return Err(BuildError::missing_schema(
                "endorsement policy",
                "An instantiate method is bound but no endorsement policy is set",
            ));
        }

        let contract = FabricContract {
            language: self.language,
            policy: self.policy.clone(),
            source_directory: self.source_directory.clone(),
            target_peers: self.target_peers.clone(),
            ..FabricContract::new(chaincode_id)
        };
        debug!(
            "Building {} binding for '{}' (chaincode '{}')",
            Fabric::NAME,
            self.bindings.interface().name,
            contract.chaincode_id
        );
        self.bindings.build(&ChaincodeSchema, contract)
    }

    fn binds_special(&self, name: &str) -> bool {
        self.bindings.method_builders().any(|method| {
            let outline = method.outline();
            outline.special_method && outline.contract_method_name.eq_ignore_ascii_case(name)
        })
    }
}

impl Deref for FabricContractBuilder {
    type Target = ContractBindingBuilder<Fabric>;

    fn deref(&self) -> &Self::Target {
        &self.bindings
    }
}

impl DerefMut for FabricContractBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bindings
    }
}
