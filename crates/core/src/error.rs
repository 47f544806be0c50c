//! Error types for binding construction, value conversion and contract calls.

use thiserror::Error;

/// Boxed collaborator error carried by [`CallError`] and [`DeploymentError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building a contract binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `build()` was invoked on a builder that already produced its value.
    #[error("build() must not be called more than once!")]
    AlreadyBuilt,

    /// A built value was requested before `build()` ran.
    #[error("build() must be called before retrieving the {what}!")]
    NotBuilt {
        /// Name of the value that was requested.
        what: String,
    },

    /// A method, parameter, field or event was referenced that the interface does not declare.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// A piece of chain configuration required to build the binding is absent.
    #[error("Missing {what}: {message}")]
    MissingSchema {
        /// The absent piece (ABI, chaincode id, endorsement policy, ...).
        what: String,
        /// Error message.
        message: String,
    },

    /// The declared interface does not fit the chain schema.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message.
        message: String,
    },
}

impl BuildError {
    /// Create a not-built error.
    pub fn not_built<S: Into<String>>(what: S) -> Self {
        Self::NotBuilt { what: what.into() }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a missing schema error.
    pub fn missing_schema<W: Into<String>, S: Into<String>>(what: W, message: S) -> Self {
        Self::MissingSchema {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

/// Errors raised while marshalling arguments or unmarshalling results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// No registered converter can turn the source type into the target type.
    #[error("No type converter registered for types: declared '{declared}', actual '{actual}'")]
    NoConverter {
        /// Requested target type.
        declared: String,
        /// Type of the value that needed conversion.
        actual: String,
    },

    /// A converter was referenced by name but never registered.
    #[error("Unknown type converter '{name}'")]
    UnknownConverter {
        /// Converter name.
        name: String,
    },

    /// The named converter handles neither direction for the given value.
    #[error("Type converter '{name}' is not suitable: declared '{declared}', actual '{actual}'")]
    UnsuitableConverter {
        /// Converter name.
        name: String,
        /// Type the converter was expected to produce.
        declared: String,
        /// Type of the value handed to the converter.
        actual: String,
    },

    /// A converted value does not match the declared type.
    #[error("Type mismatch: declared '{declared}', actual '{actual}'")]
    TypeMismatch {
        /// Declared type.
        declared: String,
        /// Actual type.
        actual: String,
    },

    /// The conversion itself failed.
    #[error("Failed to convert '{actual}' to '{declared}': {message}")]
    ConversionFailed {
        /// Target type.
        declared: String,
        /// Source type.
        actual: String,
        /// Error message.
        message: String,
    },

    /// A wire type string could not be parsed or is not supported.
    #[error("Malformed wire type '{wire_type}': {message}")]
    MalformedWireType {
        /// Offending type string.
        wire_type: String,
        /// Error message.
        message: String,
    },

    /// The number of arguments differs from the number of declared parameters.
    #[error("Number of given arguments differs from the declared parameters: declared {declared}, actual {actual}")]
    ArgumentCount {
        /// Declared parameter count.
        declared: usize,
        /// Given argument count.
        actual: usize,
    },

    /// A converter with the same name or type pair is already registered.
    #[error("Duplicate type converter: {message}")]
    DuplicateConverter {
        /// Error message.
        message: String,
    },
}

impl ConvertError {
    /// Create a no-converter error.
    pub fn no_converter<D: ToString, A: ToString>(declared: D, actual: A) -> Self {
        Self::NoConverter {
            declared: declared.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch<D: ToString, A: ToString>(declared: D, actual: A) -> Self {
        Self::TypeMismatch {
            declared: declared.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a conversion failure.
    pub fn conversion_failed<D: ToString, A: ToString, S: Into<String>>(
        declared: D,
        actual: A,
        message: S,
    ) -> Self {
        Self::ConversionFailed {
            declared: declared.to_string(),
            actual: actual.to_string(),
            message: message.into(),
        }
    }

    /// Create a malformed wire type error.
    pub fn malformed_wire_type<T: Into<String>, S: Into<String>>(wire_type: T, message: S) -> Self {
        Self::MalformedWireType {
            wire_type: wire_type.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by, or while talking to, the chain client.
#[derive(Error, Debug)]
pub enum CallError {
    /// The collaborator failed to execute the call.
    #[error("{message}")]
    Client {
        /// Error message.
        message: String,
        /// Underlying collaborator error.
        #[source]
        source: Option<BoxError>,
    },

    /// A transaction was mined with a failure status.
    #[error("Failed to execute transaction, status: '{status}'.")]
    TransactionFailed {
        /// Reported status.
        status: String,
    },

    /// Peers returned diverging proposal responses.
    #[error("Received inconsistent responses from peers: {message}")]
    InconsistentResponses {
        /// Error message.
        message: String,
    },

    /// A bounded wait ran out.
    #[error("Timed out: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// A special argument or call shape was rejected.
    #[error("Invalid call: {message}")]
    InvalidCall {
        /// Error message.
        message: String,
    },

    /// The call completed without a value although one was declared.
    #[error("Contract method '{method}' did not yield any results but its return type is declared as '{declared}'")]
    MissingResult {
        /// Remote method name.
        method: String,
        /// Declared return type.
        declared: String,
    },

    /// The worker running the call was cancelled or panicked.
    #[error("Call worker failed: {message}")]
    Worker {
        /// Error message.
        message: String,
    },
}

impl CallError {
    /// Create a client error without a source.
    pub fn client<S: Into<String>>(message: S) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Create a client error wrapping the collaborator's native error.
    pub fn client_with<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an inconsistent responses error.
    pub fn inconsistent<S: Into<String>>(message: S) -> Self {
        Self::InconsistentResponses {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create an invalid call error.
    pub fn invalid_call<S: Into<String>>(message: S) -> Self {
        Self::InvalidCall {
            message: message.into(),
        }
    }
}

/// Errors specific to deploying, installing or instantiating a contract.
#[derive(Error, Debug)]
pub enum DeploymentError {
    /// The binding already carries a deployment address.
    #[error("Cannot deploy contract '{contract}', contract address already set in contract info.")]
    AddressAlreadySet {
        /// Contract identifier.
        contract: String,
    },

    /// A deployment artifact (binary, source directory, policy, ...) is absent.
    #[error("Cannot deploy contract '{contract}', {what} is not set in contract info.")]
    MissingArtifact {
        /// Contract identifier.
        contract: String,
        /// The absent artifact.
        what: String,
    },

    /// The deployment was rejected by the network.
    #[error("Failed to deploy contract '{contract}': {message}")]
    Rejected {
        /// Contract identifier.
        contract: String,
        /// Error message.
        message: String,
        /// Underlying collaborator error.
        #[source]
        source: Option<BoxError>,
    },
}

impl DeploymentError {
    /// Create an address-already-set error.
    pub fn address_already_set<S: Into<String>>(contract: S) -> Self {
        Self::AddressAlreadySet {
            contract: contract.into(),
        }
    }

    /// Create a missing artifact error.
    pub fn missing_artifact<C: Into<String>, W: Into<String>>(contract: C, what: W) -> Self {
        Self::MissingArtifact {
            contract: contract.into(),
            what: what.into(),
        }
    }

    /// Create a rejected deployment error.
    pub fn rejected<C: Into<String>, S: Into<String>>(contract: C, message: S) -> Self {
        Self::Rejected {
            contract: contract.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a rejected deployment error wrapping the collaborator's native error.
    pub fn rejected_with<C, S, E>(contract: C, message: S, source: E) -> Self
    where
        C: Into<String>,
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::Rejected {
            contract: contract.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Errors raised by contract registries.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Identifiers must not be empty.
    #[error("Contract identifier must not be empty")]
    EmptyIdentifier,

    /// A binding with the same identifier is already registered.
    #[error("ContractRegistry already contains a binding with key '{identifier}'.")]
    Duplicate {
        /// Contract identifier.
        identifier: String,
    },

    /// The configured base path is not a directory.
    #[error("Registry path '{path}' exists but is not a directory")]
    NotADirectory {
        /// Offending path.
        path: String,
    },

    /// Reading or writing a registry file failed.
    #[error("Registry I/O error on '{path}': {source}")]
    Io {
        /// File or directory path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A registry document could not be (de)serialized.
    #[error("Registry serialization error on '{path}': {source}")]
    Serialization {
        /// File path.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Any error surfaced by the binding core.
#[derive(Error, Debug)]
pub enum Error {
    /// Binding construction failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Argument or result conversion failed.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The chain client reported a failure.
    #[error(transparent)]
    Call(#[from] CallError),

    /// Deployment failed.
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    /// Registry access failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, Error>;
