//! Reduction engine
//!
//! Combines two partial results of the same output under a deal:
//! - `sum`: numbers add, lists concatenate (optionally truncated)
//! - `and` / `or`: boolean logic
//! - `average`: pairwise mean
//! - `sort`: stable two-pointer merge of pre-sorted record lists, with
//!   optional unification of records sharing a group key
//!
//! `reduce` is pure and never logs. `ReduceCollector` is the receiving
//! side of a reduce message and isolates failures per output.

mod collector;
mod compare;
mod deal;
mod errors;
mod merge;
mod reducer;
mod registry;

pub use collector::{ReduceCollector, ReduceOutcome};
pub use compare::compare;
pub use deal::{limit_cap, Comparator, DealSpec, SortDeal, SortOperator, UNLIMITED};
pub use errors::{ReduceError, ReduceResult};
pub use merge::{merge_sorted, sort_records};
pub use reducer::reduce;
pub use registry::{DealFactory, ReducerRegistry};
