use super::{Chain, EventBinding, MethodBinding};
use crate::ids::MethodId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Binding of a whole contract.
///
/// Built once by a builder and shared read-only afterwards; only the chain's
/// deployment state may change later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ContractBinding<C: Chain> {
    pub(crate) identifier: String,
    pub(crate) interface: String,
    pub(crate) methods: IndexMap<MethodId, MethodBinding<C>>,
    pub(crate) events: IndexMap<String, EventBinding<C>>,
    pub(crate) chain: C::Contract,
}

impl<C: Chain> ContractBinding<C> {
    /// Registry identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Name of the interface the binding was built from.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Method bindings keyed by method identifier.
    pub fn methods(&self) -> &IndexMap<MethodId, MethodBinding<C>> {
        &self.methods
    }

    /// A method binding.
    pub fn method(&self, id: &MethodId) -> Option<&MethodBinding<C>> {
        self.methods.get(id)
    }

    /// Event bindings keyed by event name.
    pub fn events(&self) -> &IndexMap<String, EventBinding<C>> {
        &self.events
    }

    /// An event binding by event name.
    pub fn event(&self, event_name: &str) -> Option<&EventBinding<C>> {
        self.events.get(event_name)
    }

    /// The event binding subscribed to by a method.
    pub fn event_for_method(&self, method: &MethodId) -> Option<&EventBinding<C>> {
        self.events.values().find(|e| e.method == *method)
    }

    /// Chain specific contract data.
    pub fn chain(&self) -> &C::Contract {
        &self.chain
    }
}
