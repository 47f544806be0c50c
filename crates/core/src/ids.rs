//! Stable identifiers for declared members.

use crate::types::NativeType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a method by name and parameter types, e.g. `transfer(String,BigInt)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(String);

impl MethodId {
    /// Builds the identifier of `name(types...)`.
    pub fn new(name: &str, parameter_types: &[NativeType]) -> Self {
        let types = parameter_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self(format!("{}({})", name, types))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The method name part.
    pub fn name(&self) -> &str {
        self.0.split('(').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a parameter by its method and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterId {
    /// Owning method.
    pub method: MethodId,
    /// Zero based position.
    pub index: usize,
}

impl ParameterId {
    /// Creates a parameter identifier.
    pub fn new(method: MethodId, index: usize) -> Self {
        Self { method, index }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.method, self.index)
    }
}
