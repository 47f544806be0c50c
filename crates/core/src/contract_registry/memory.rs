use super::{ContractRegistry, Entries};
use crate::error::RegistryError;
use crate::metadata::Chain;

/// Registry that lives for the duration of the process.
#[derive(Debug, Default)]
pub struct InMemoryContractRegistry<C: Chain> {
    entries: Entries<C>,
}

impl<C: Chain> InMemoryContractRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { entries: Entries::new() }
    }
}

impl<C: Chain> ContractRegistry<C> for InMemoryContractRegistry<C> {
    fn entries(&self) -> &Entries<C> {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut Entries<C> {
        &mut self.entries
    }

    fn persist(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn load(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}
