//! Observable events
//!
//! Events are explicit and typed; the string form is the `event` field of
//! the log line.

use std::fmt;

use super::logger::Severity;

/// Observable events of planning and collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    ConfigLoaded,

    // Planning
    /// Plan requested
    PlanBegin,
    /// Plan messages produced
    PlanComplete,
    /// Request rejected by the planner
    PlanRejected,

    // Reduction
    /// One pairwise reduction of a whole response finished
    ReduceComplete,
    /// One output could not be reduced; siblings continue
    ReduceOutputFailed,

    // Gather
    /// Final response assembled
    GatherComplete,
    /// One output could not be projected; siblings continue
    GatherOutputFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::PlanBegin => "PLAN_BEGIN",
            Event::PlanComplete => "PLAN_COMPLETE",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::ReduceComplete => "REDUCE_COMPLETE",
            Event::ReduceOutputFailed => "REDUCE_OUTPUT_FAILED",
            Event::GatherComplete => "GATHER_COMPLETE",
            Event::GatherOutputFailed => "GATHER_OUTPUT_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReduceComplete => Severity::Trace,
            Event::ReduceOutputFailed | Event::GatherOutputFailed | Event::PlanRejected => {
                Severity::Warn
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
