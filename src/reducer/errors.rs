//! Reduction errors
//!
//! Every reduction error is scoped to one output: the collector reports it
//! on the `errors` channel and keeps reducing the sibling outputs.

use serde_json::{json, Value};
use thiserror::Error;

/// Result type for reduce operations
pub type ReduceResult<T> = Result<T, ReduceError>;

/// Reduce errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// Deal type not present in the registry
    #[error("Unknown reduce type: {0}")]
    UnknownReduceType(String),

    /// Per-element deal names an element the engine does not know
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// Operands cannot be combined by the deal
    #[error("Cannot {deal} {left} with {right}")]
    TypeMismatch {
        deal: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Deal descriptor is malformed
    #[error("Invalid deal: {0}")]
    InvalidDeal(String),

    /// Reduce message is malformed as a whole
    #[error("Invalid reduce message: {0}")]
    InvalidMessage(String),
}

impl ReduceError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ReduceError::UnknownReduceType(_) => "SHARDPLAN_UNKNOWN_REDUCE_TYPE",
            ReduceError::UnknownElement(_) => "SHARDPLAN_UNKNOWN_ELEMENT",
            ReduceError::TypeMismatch { .. } => "SHARDPLAN_REDUCE_TYPE_MISMATCH",
            ReduceError::InvalidDeal(_) => "SHARDPLAN_INVALID_DEAL",
            ReduceError::InvalidMessage(_) => "SHARDPLAN_INVALID_REDUCE_MESSAGE",
        }
    }

    /// Builds the entry appended to the `errors` output
    pub fn to_error_entry(&self, output: &str) -> Value {
        json!({
            "output": output,
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}
