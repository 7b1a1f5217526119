//! Distributed search planner
//!
//! Rewrites a logical search request for a sharded dataset.
//!
//! # Top-K rule
//!
//! No shard knows the global rank of its rows. A query asking for rows
//! `[offset, offset + limit)` is therefore sent to every shard as
//! `offset = 0, limit = offset + limit`; the merged list is guaranteed to
//! contain the global window, which the gather step slices out.
//!
//! # Output
//!
//! Shards always return positional tuples. Column positions of sort keys
//! and group columns are fixed at plan time, and the requested format is
//! restored by the gather step.

mod ast;
mod config;
mod errors;
mod explain;
mod planner;
mod transform;
mod window;

pub use ast::{
    Element, GroupBy, LogicalRequest, OutputSpec, QuerySpec, RecordFormat, RichGroupBy, RichSort,
    SortBy,
};
pub use config::PlannerConfig;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::{ExplainPlan, QueryExplain};
pub use planner::DistributedSearchPlanner;
pub use transform::{
    plan_query, PlannedQuery, SortKey, GROUP_KEY_ATTRIBUTE, N_SUB_RECORDS_ATTRIBUTE,
    SUB_RECORDS_ATTRIBUTE,
};
pub use window::RecordWindow;
