//! Stores of built contract bindings keyed by identifier.
//!
//! A registry is what lets an application build a binding once, deploy it,
//! and pick it (including its deployment address) up again later. The
//! [`FileSystemContractRegistry`] persists every binding as one JSON document.

mod filesystem;
mod memory;

pub use filesystem::FileSystemContractRegistry;
pub use memory::InMemoryContractRegistry;

use crate::error::RegistryError;
use crate::metadata::{Chain, ContractBinding};
use indexmap::IndexMap;
use std::sync::Arc;

/// Bindings stored by a registry.
pub type Entries<C> = IndexMap<String, Arc<ContractBinding<C>>>;

/// A store of contract bindings.
pub trait ContractRegistry<C: Chain> {
    /// The stored bindings.
    fn entries(&self) -> &Entries<C>;

    /// Mutable access to the stored bindings.
    fn entries_mut(&mut self) -> &mut Entries<C>;

    /// Writes the stored bindings to the backing store.
    fn persist(&self) -> Result<(), RegistryError>;

    /// Replaces the stored bindings with the content of the backing store.
    fn load(&mut self) -> Result<(), RegistryError>;

    /// The binding registered under `identifier`.
    fn get(&self, identifier: &str) -> Option<Arc<ContractBinding<C>>> {
        self.entries().get(identifier).cloned()
    }

    /// Registers a binding, failing if its identifier is taken.
    fn add(&mut self, binding: Arc<ContractBinding<C>>) -> Result<(), RegistryError> {
        let identifier = checked_identifier(&binding)?;
        if self.entries().contains_key(&identifier) {
            return Err(RegistryError::Duplicate { identifier });
        }
        self.entries_mut().insert(identifier, binding);
        Ok(())
    }

    /// Registers a binding, replacing one with the same identifier.
    fn add_or_update(&mut self, binding: Arc<ContractBinding<C>>) -> Result<(), RegistryError> {
        let identifier = checked_identifier(&binding)?;
        self.entries_mut().insert(identifier, binding);
        Ok(())
    }

    /// Registers a binding unless its identifier is taken; returns whether it was added.
    fn add_if_absent(&mut self, binding: Arc<ContractBinding<C>>) -> Result<bool, RegistryError> {
        let identifier = checked_identifier(&binding)?;
        if self.entries().contains_key(&identifier) {
            return Ok(false);
        }
        self.entries_mut().insert(identifier, binding);
        Ok(true)
    }

    /// Whether a binding is registered under `identifier`.
    fn is_registered(&self, identifier: &str) -> bool {
        self.entries().contains_key(identifier)
    }

    /// All registered bindings in registration order.
    fn bindings(&self) -> Vec<Arc<ContractBinding<C>>> {
        self.entries().values().cloned().collect()
    }
}

fn checked_identifier<C: Chain>(binding: &ContractBinding<C>) -> Result<String, RegistryError> {
    if binding.identifier().is_empty() {
        Err(RegistryError::EmptyIdentifier)
    } else {
        Ok(binding.identifier().to_string())
    }
}
