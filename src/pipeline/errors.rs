//! Pipeline errors
//!
//! Unlike per-output reduce and gather failures, these abort the whole
//! run: there is no response to attach them to.

use thiserror::Error;

use crate::gather::GatherError;
use crate::reducer::ReduceError;

/// Result type for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Nothing to reduce
    #[error("No shard responses to reduce")]
    NoResponses,

    /// A shard could not execute the broadcast body
    #[error("Shard {shard} failed: {message}")]
    Shard { shard: usize, message: String },

    /// The reduce message itself is malformed
    #[error(transparent)]
    Reduce(#[from] ReduceError),

    /// The gather message itself is malformed
    #[error(transparent)]
    Gather(#[from] GatherError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NoResponses => "SHARDPLAN_PIPELINE_NO_RESPONSES",
            PipelineError::Shard { .. } => "SHARDPLAN_PIPELINE_SHARD_FAILED",
            PipelineError::Reduce(err) => err.code(),
            PipelineError::Gather(err) => err.code(),
        }
    }
}
