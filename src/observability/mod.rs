//! Observability: structured logs, lifecycle events and counters
//!
//! Observability is read-only: nothing here changes planning, reduction or
//! gathering results, and a failed log write is ignored.
//!
//! ```ignore
//! use shardplan::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::PlanComplete, &[("plan_id", "...")]);
//! let metrics = MetricsRegistry::new();
//! metrics.increment_plans_created();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Logs a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
