//! Plan messages and their name wiring
//!
//! Naming conventions:
//! - every plan has a synthetic `errors` output next to the query outputs
//! - a broadcast output `name` is reduced into `name_reduced`
//! - the gather spec of `name_reduced` stores its value under `name`

mod graph;
mod ordered;
mod plan;

pub use graph::{MessageGraph, Route};
pub use ordered::OrderedMap;
pub use plan::{
    reduced_name, BroadcastMessage, ElementMapper, GatherMessage, GatherSpec, OutputDeal,
    PlanMessage, ReduceMessage, ReplicaPolicy, SearchPlan, ERRORS_OUTPUT, REDUCED_SUFFIX,
    SEARCH_COMMAND,
};
