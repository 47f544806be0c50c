//! # Chainbind Core
//!
//! Chain independent part of the contract binding stack.
//!
//! An application declares a contract as a [`ContractInterface`]. A
//! [`ContractBindingBuilder`] turns it, together with a chain specific
//! [`ChainSchema`], into an immutable [`ContractBinding`] that knows how every
//! argument and result maps onto the chain's wire representation. A
//! [`MethodDispatcher`] then classifies intercepted calls and hands them to a
//! chain specific [`ChainHandler`].
//!
//! ## Features
//!
//! - **Binding Model**: method, parameter, event and event field bindings
//! - **Type Conversion**: a registry of bidirectional converters with a fixed
//!   resolution precedence
//! - **Builders**: fluent overrides seeded from declarative defaults
//! - **Dispatch**: special argument extraction and call classification
//! - **Contract Registry**: in-memory and JSON file backed binding stores
//!
//! ## Example
//!
//! ```rust
//! use chainbind_core::{MethodId, NativeType};
//!
//! let id = MethodId::new("greet", &[NativeType::String, NativeType::Int]);
//! assert_eq!(id.as_str(), "greet(String,i32)");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Binding builders and the chain schema seam
pub mod builder;
/// Persisted stores of contract bindings
pub mod contract_registry;
/// Type converters and the conversion registry
pub mod convert;
/// Call classification and special arguments
pub mod dispatch;
/// Error types
pub mod error;
/// Stable method and parameter identifiers
pub mod ids;
/// Declared contract interfaces
pub mod interface;
/// The binding model
pub mod metadata;
/// Call results
pub mod result;
/// Event subscription handles
pub mod subscription;
/// Native values and types
pub mod types;

pub use builder::{ChainSchema, ContractBindingBuilder};
pub use contract_registry::{ContractRegistry, FileSystemContractRegistry, InMemoryContractRegistry};
pub use convert::{ConversionHints, TypeConverter, TypeConverters};
pub use dispatch::{CallHandle, ChainHandler, Invocation, MethodDispatcher};
pub use error::{BuildError, CallError, ConvertError, DeploymentError, Error, RegistryError, Result};
pub use ids::{MethodId, ParameterId};
pub use interface::ContractInterface;
pub use metadata::{Chain, ContractBinding, DeploymentAddress, EventBinding, MethodBinding, ParameterBinding};
pub use result::{CallResult, Reply};
pub use subscription::{EventStream, EventSubscription};
pub use types::{NativeType, Value};

/// Commonly used items.
pub mod prelude {
    pub use crate::builder::{ChainSchema, ContractBindingBuilder};
    pub use crate::contract_registry::ContractRegistry;
    pub use crate::dispatch::{ChainHandler, MethodDispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::ids::MethodId;
    pub use crate::interface::{
        ContractInterface, EventTypeDescriptor, FieldSignature, MethodSignature, ParameterSignature, ReturnSignature,
    };
    pub use crate::result::{CallResult, Reply};
    pub use crate::types::{NativeType, Value};
}
