//! shardplan - distributed search planning over a sharded dataset
//!
//! A search request names a dataset and one or more queries. The planner
//! rewrites it into three messages: a broadcast executed by every shard,
//! a reduce message merging shard results pairwise, and a gather message
//! projecting the merged result into the response the caller asked for.
//! Reduction and gather collectors apply those messages on the receiving
//! side, and the local pipeline drives a whole plan in process.

pub mod cli;
pub mod gather;
pub mod message;
pub mod observability;
pub mod pipeline;
pub mod planner;
pub mod reducer;

pub use gather::{GatherCollector, GatherError};
pub use message::{PlanMessage, SearchPlan};
pub use pipeline::{LocalPipeline, PipelineConfig, ReductionTree, ShardExecutor};
pub use planner::{DistributedSearchPlanner, LogicalRequest, PlannerConfig, PlannerError};
pub use reducer::{reduce, DealSpec, ReduceCollector, ReduceError, ReducerRegistry};
