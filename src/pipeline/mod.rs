//! Local execution of a search plan
//!
//! Stands in for the transport layer: the broadcast body goes to every
//! shard, the responses are reduced pairwise and the result is gathered
//! once. Both reduction trees give the same response because every deal
//! is associative.

mod config;
mod errors;
mod local;
mod shard;

pub use config::{PipelineConfig, ReductionTree};
pub use errors::{PipelineError, PipelineResult};
pub use local::LocalPipeline;
pub use shard::{RecordedShard, ShardExecutor};
