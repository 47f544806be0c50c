//! Values handed back to callers.

use crate::error::{CallError, ConvertError};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// A call or event value together with where it was recorded on chain.
///
/// Queries and other calls that never reach a block carry no hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult<T> {
    /// The value.
    pub data: T,
    /// Hash of the block containing the transaction.
    pub block_hash: Option<String>,
    /// Transaction hash.
    pub transaction_hash: Option<String>,
}

impl<T> CallResult<T> {
    /// A value without block metadata.
    pub fn unrecorded(data: T) -> Self {
        Self {
            data,
            block_hash: None,
            transaction_hash: None,
        }
    }

    /// A value recorded in a block.
    pub fn recorded<B: Into<String>, H: Into<String>>(data: T, block_hash: B, transaction_hash: H) -> Self {
        Self {
            data,
            block_hash: Some(block_hash.into()),
            transaction_hash: Some(transaction_hash.into()),
        }
    }

    /// Replaces the value, keeping the hashes.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CallResult<U> {
        CallResult {
            data: f(self.data),
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
        }
    }

    /// Fallible [`map`](Self::map).
    pub fn try_map<U, E, F: FnOnce(T) -> Result<U, E>>(self, f: F) -> Result<CallResult<U>, E> {
        Ok(CallResult {
            data: f(self.data)?,
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
        })
    }
}

/// What a dispatched call or an event subscription yields.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The converted value.
    Value(Value),
    /// The converted value wrapped with block metadata.
    Wrapped(CallResult<Value>),
}

impl Reply {
    /// Wraps `result` when `wrapped` is set, otherwise returns its data only.
    pub fn new(result: CallResult<Value>, wrapped: bool) -> Self {
        if wrapped {
            Reply::Wrapped(result)
        } else {
            Reply::Value(result.data)
        }
    }

    /// The carried value.
    pub fn value(&self) -> &Value {
        match self {
            Reply::Value(value) => value,
            Reply::Wrapped(result) => &result.data,
        }
    }

    /// Consumes the reply into its value.
    pub fn into_value(self) -> Value {
        match self {
            Reply::Value(value) => value,
            Reply::Wrapped(result) => result.data,
        }
    }

    /// Consumes the reply into its wrapped form.
    pub fn into_wrapped(self) -> Result<CallResult<Value>, CallError> {
        match self {
            Reply::Wrapped(result) => Ok(result),
            Reply::Value(value) => Err(CallError::invalid_call(format!(
                "reply {} does not use the result wrapper",
                value
            ))),
        }
    }

    /// Extracts the value as `T`.
    pub fn extract<T>(self) -> Result<T, ConvertError>
    where
        T: TryFrom<Value, Error = ConvertError>,
    {
        T::try_from(self.into_value())
    }
}

/// Converts a value into the reply variant matching `wrapped`, for values not recorded on chain.
pub fn unrecorded_reply(value: Value, wrapped: bool) -> Reply {
    Reply::new(CallResult::unrecorded(value), wrapped)
}

/// Reply of a void method.
pub fn void_reply() -> Reply {
    Reply::Value(Value::Unit)
}
