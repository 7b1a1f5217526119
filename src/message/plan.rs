//! Plan messages: broadcast, reduce and gather descriptors
//!
//! A plan is three messages wired by name. The broadcast fans the rewritten
//! request out to the shards and names each shard-side result; the reduce
//! message says how two partial results of each name combine; the gather
//! message says how each reduced result is projected into the response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::planner::{LogicalRequest, RecordFormat};
use crate::reducer::DealSpec;

use super::ordered::OrderedMap;

/// Name of the synthetic output carrying per-shard and per-output errors
pub const ERRORS_OUTPUT: &str = "errors";

/// Suffix of a reduced output's name
pub const REDUCED_SUFFIX: &str = "_reduced";

/// Broadcast command executed by every shard
pub const SEARCH_COMMAND: &str = "search";

/// Returns the reduced output name for a broadcast output
pub fn reduced_name(name: &str) -> String {
    format!("{}{}", name, REDUCED_SUFFIX)
}

/// Which replicas of each shard receive the broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaPolicy {
    /// One replica chosen by the transport
    #[default]
    Random,
    /// Every replica
    All,
}

impl ReplicaPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaPolicy::Random => "random",
            ReplicaPolicy::All => "all",
        }
    }
}

/// Fan-out of the rewritten request to every shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub command: String,
    pub dataset: String,
    pub body: LogicalRequest,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub replica: ReplicaPolicy,
}

/// Deal of one reduced output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputDeal {
    /// The whole value is combined by one deal
    Single(DealSpec),
    /// Each element of an object value has its own deal
    PerElement(OrderedMap<DealSpec>),
}

/// Pairwise combination of partial results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceMessage {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// input name -> reduced output name -> deal
    pub body: OrderedMap<OrderedMap<OutputDeal>>,
}

/// Projection of one reduced element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMapper {
    /// Recompute this element as the length of another element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Count `target` before its record window is applied
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub before_window: bool,
    /// Reduced but not part of the response
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RecordFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl ElementMapper {
    /// Mapper recomputing an element from the size of `target`
    pub fn count_of(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Mapper counting every row of `target`, ignoring its window
    pub fn count_all_of(target: impl Into<String>) -> Self {
        Self {
            before_window: true,
            ..Self::count_of(target)
        }
    }

    /// Mapper windowing and reshaping records
    pub fn records(attributes: Vec<String>, format: RecordFormat, offset: i64, limit: i64) -> Self {
        Self {
            attributes: Some(attributes),
            format: Some(format),
            offset: Some(offset),
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Projection of one reduced output into the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatherSpec {
    /// Response key the projected value is stored under
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<OrderedMap<ElementMapper>>,
}

impl GatherSpec {
    /// Spec copying a value through unchanged
    pub fn passthrough(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            elements: None,
        }
    }
}

/// Final assembly of the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatherMessage {
    pub inputs: Vec<String>,
    /// The gathered response is posted back to the caller
    #[serde(default)]
    pub post: bool,
    /// reduced output name -> projection
    pub body: OrderedMap<GatherSpec>,
}

/// One message of a plan, tagged with its wire type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanMessage {
    #[serde(rename = "broadcast")]
    Broadcast(BroadcastMessage),
    #[serde(rename = "search_reduce")]
    Reduce(ReduceMessage),
    #[serde(rename = "search_gather")]
    Gather(GatherMessage),
}

impl PlanMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            PlanMessage::Broadcast(_) => "broadcast",
            PlanMessage::Reduce(_) => "search_reduce",
            PlanMessage::Gather(_) => "search_gather",
        }
    }
}

/// The three messages produced for one logical request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub id: Uuid,
    pub broadcast: BroadcastMessage,
    pub reduce: ReduceMessage,
    pub gather: GatherMessage,
}

impl SearchPlan {
    /// Messages in execution order
    pub fn messages(&self) -> Vec<PlanMessage> {
        vec![
            PlanMessage::Broadcast(self.broadcast.clone()),
            PlanMessage::Reduce(self.reduce.clone()),
            PlanMessage::Gather(self.gather.clone()),
        ]
    }

    /// `{"planId": ..., "messages": [...]}`
    pub fn to_json(&self) -> Value {
        json!({
            "planId": self.id.to_string(),
            "messages": self.messages(),
        })
    }
}
