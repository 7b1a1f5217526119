//! Planner configuration

use serde::{Deserialize, Serialize};

use crate::message::ReplicaPolicy;

fn default_limit() -> i64 {
    10
}

/// Settings applied to every planned request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Record limit of an output that names none; -1 means unlimited
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    /// Replica selection written into every broadcast
    #[serde(default)]
    pub replica: ReplicaPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            replica: ReplicaPolicy::default(),
        }
    }
}
