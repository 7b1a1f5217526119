//! Shard execution seam
//!
//! The pipeline never runs a query itself. Whatever executes a broadcast
//! body on one shard (a storage engine, a remote node, a test fixture)
//! implements `ShardExecutor`.

use serde_json::Value;

use crate::planner::LogicalRequest;

use super::errors::PipelineResult;

/// Executes the broadcast body on one shard
pub trait ShardExecutor {
    /// Returns the shard response: broadcast output name -> partial result
    fn execute(&self, body: &LogicalRequest) -> PipelineResult<Value>;
}

impl<F> ShardExecutor for F
where
    F: Fn(&LogicalRequest) -> PipelineResult<Value>,
{
    fn execute(&self, body: &LogicalRequest) -> PipelineResult<Value> {
        self(body)
    }
}

/// Shard that answers every request with a recorded response
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedShard {
    response: Value,
}

impl RecordedShard {
    pub fn new(response: Value) -> Self {
        Self { response }
    }
}

impl ShardExecutor for RecordedShard {
    fn execute(&self, _body: &LogicalRequest) -> PipelineResult<Value> {
        Ok(self.response.clone())
    }
}
