//! Gather errors
//!
//! Like reduction errors, these are scoped to one output and reported on
//! the `errors` channel of the response.

use serde_json::{json, Value};
use thiserror::Error;

/// Result type for gather operations
pub type GatherResult<T> = Result<T, GatherError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatherError {
    /// Mapper names an element the projector does not know
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// Reduced value does not have the shape the mapper needs
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Mapper or message is malformed
    #[error("Invalid gather spec: {0}")]
    InvalidSpec(String),
}

impl GatherError {
    pub fn code(&self) -> &'static str {
        match self {
            GatherError::UnknownElement(_) => "SHARDPLAN_GATHER_UNKNOWN_ELEMENT",
            GatherError::InvalidValue(_) => "SHARDPLAN_GATHER_INVALID_VALUE",
            GatherError::InvalidSpec(_) => "SHARDPLAN_GATHER_INVALID_SPEC",
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
