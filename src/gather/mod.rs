//! Gather phase
//!
//! Turns the fully reduced response into what the caller sees: each
//! reduced output is renamed back to its query name, its records are cut
//! to the requested window and reshaped, counts marked with a `target`
//! are recomputed, and hidden elements are dropped.

mod collector;
mod errors;
mod projector;

pub use collector::{GatherCollector, GatherOutcome};
pub use errors::{GatherError, GatherResult};
pub use projector::{project, project_records, reshape};
