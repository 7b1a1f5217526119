//! Search request structures
//!
//! Defines the logical request a caller submits and the per-query output
//! description the planner rewrites for the shards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::OrderedMap;
use crate::reducer::UNLIMITED;

use super::errors::{PlannerError, PlannerResult};

/// Output elements a query can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    /// Total number of matching records
    Count,
    /// The matching records themselves
    Records,
}

impl Element {
    /// Every element, in canonical order
    pub const ALL: [Element; 2] = [Element::Count, Element::Records];

    /// Returns the wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Count => "count",
            Element::Records => "records",
        }
    }

    /// Parses a wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|element| element.as_str() == name)
    }
}

/// Shape of each returned record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// Positional tuple matched to `attributes`
    #[default]
    Simple,
    /// Object keyed by attribute name
    Complex,
}

impl RecordFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordFormat::Simple => "simple",
            RecordFormat::Complex => "complex",
        }
    }
}

fn default_elements() -> Vec<String> {
    Element::ALL.iter().map(|e| e.as_str().to_string()).collect()
}

/// Requested output of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    #[serde(default)]
    pub format: RecordFormat,
    /// Element names; validated at plan time
    #[serde(default = "default_elements")]
    pub elements: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub offset: i64,
    /// Absent means the configured default limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Requested elements computed by the shards but left out of the
    /// response; a hidden `count` is recomputed from the returned records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_output: Vec<String>,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: RecordFormat::Simple,
            elements: default_elements(),
            attributes: Vec::new(),
            offset: 0,
            limit: None,
            no_output: Vec::new(),
        }
    }
}

impl OutputSpec {
    pub fn with_elements(mut self, elements: &[Element]) -> Self {
        self.elements = elements.iter().map(|e| e.as_str().to_string()).collect();
        self
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Marks requested elements as hidden from the response
    pub fn with_no_output(mut self, elements: &[Element]) -> Self {
        self.no_output = elements.iter().map(|e| e.as_str().to_string()).collect();
        self
    }

    /// Returns true if the element was requested
    pub fn wants(&self, element: Element) -> bool {
        self.elements.iter().any(|name| name == element.as_str())
    }

    /// Returns true if the element was requested but must not be output
    pub fn hides(&self, element: Element) -> bool {
        self.no_output.iter().any(|name| name == element.as_str())
    }

    /// Parses the element list, rejecting unknown or repeated names
    pub fn parsed_elements(&self) -> PlannerResult<Vec<Element>> {
        let mut parsed = Vec::with_capacity(self.elements.len());
        for name in &self.elements {
            let element = Element::parse(name)
                .ok_or_else(|| PlannerError::invalid_output(format!("unknown element '{}'", name)))?;
            if parsed.contains(&element) {
                return Err(PlannerError::invalid_output(format!(
                    "element '{}' listed twice",
                    name
                )));
            }
            parsed.push(element);
        }
        for name in &self.no_output {
            match Element::parse(name) {
                Some(element) if parsed.contains(&element) => {}
                _ => {
                    return Err(PlannerError::invalid_output(format!(
                        "noOutput element '{}' is not a requested element",
                        name
                    )))
                }
            }
        }
        Ok(parsed)
    }
}

/// Rich sort description with its own window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichSort {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "unlimited")]
    pub limit: i64,
}

fn unlimited() -> i64 {
    UNLIMITED
}

/// Sort order of a query: a bare key list or a rich object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortBy {
    Keys(Vec<String>),
    Rich(RichSort),
}

impl SortBy {
    pub fn keys(&self) -> &[String] {
        match self {
            SortBy::Keys(keys) => keys,
            SortBy::Rich(rich) => &rich.keys,
        }
    }

    pub fn offset(&self) -> i64 {
        match self {
            SortBy::Keys(_) => 0,
            SortBy::Rich(rich) => rich.offset,
        }
    }

    pub fn limit(&self) -> i64 {
        match self {
            SortBy::Keys(_) => UNLIMITED,
            SortBy::Rich(rich) => rich.limit,
        }
    }

    pub fn is_rich(&self) -> bool {
        matches!(self, SortBy::Rich(_))
    }
}

/// Grouping description with sub-record sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichGroupBy {
    pub key: String,
    #[serde(default)]
    pub max_n_sub_records: i64,
}

/// Grouping of a query: a bare key or a rich object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupBy {
    Key(String),
    Rich(RichGroupBy),
}

impl GroupBy {
    pub fn key(&self) -> &str {
        match self {
            GroupBy::Key(key) => key,
            GroupBy::Rich(rich) => &rich.key,
        }
    }

    pub fn max_n_sub_records(&self) -> i64 {
        match self {
            GroupBy::Key(_) => 0,
            GroupBy::Rich(rich) => rich.max_n_sub_records,
        }
    }
}

/// One named sub-query of a search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Table or collection identifier, opaque here
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    /// Conditions and other shard-side parameters, forwarded untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuerySpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output: None,
            sort_by: None,
            group_by: None,
            extra: Map::new(),
        }
    }

    pub fn with_output(mut self, output: OutputSpec) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets a plain sort key list (`-key` sorts descending)
    pub fn with_sort_keys(mut self, keys: &[&str]) -> Self {
        self.sort_by = Some(SortBy::Keys(keys.iter().map(|k| k.to_string()).collect()));
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }
}

/// A search over one dataset with any number of named queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default)]
    pub queries: OrderedMap<QuerySpec>,
    /// Request-level parameters (timeouts and such), forwarded untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogicalRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, query: QuerySpec) -> Self {
        self.queries.insert(name, query);
        self
    }

    /// Decodes a request from JSON, reporting malformed input as a
    /// planner rejection
    pub fn from_value(value: Value) -> PlannerResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| PlannerError::invalid_request(format!("malformed search request: {}", e)))
    }
}
