//! Planner error types
//!
//! Error codes:
//! - SHARDPLAN_MISSING_DATASET (REJECT)
//! - SHARDPLAN_QUERIES_NOT_GIVEN (REJECT)
//! - SHARDPLAN_INVALID_REQUEST (REJECT)
//! - SHARDPLAN_INVALID_OUTPUT (REJECT)
//! - SHARDPLAN_INVALID_SORT_KEY (REJECT)
//! - SHARDPLAN_INVALID_GROUP_BY (REJECT)
//! - SHARDPLAN_INVALID_GRAPH (REJECT)
//!
//! Every planning error is fatal to the request: no message is emitted.

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Request names no dataset
    MissingDataset,
    /// Request carries no queries
    QueriesNotGiven,
    /// Request could not be decoded or uses a reserved name
    InvalidRequest,
    /// Malformed output description
    InvalidOutput,
    /// Malformed sort key
    InvalidSortKey,
    /// Malformed grouping
    InvalidGroupBy,
    /// Generated message graph violates its wiring rules
    InvalidGraph,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::MissingDataset => "SHARDPLAN_MISSING_DATASET",
            PlannerErrorCode::QueriesNotGiven => "SHARDPLAN_QUERIES_NOT_GIVEN",
            PlannerErrorCode::InvalidRequest => "SHARDPLAN_INVALID_REQUEST",
            PlannerErrorCode::InvalidOutput => "SHARDPLAN_INVALID_OUTPUT",
            PlannerErrorCode::InvalidSortKey => "SHARDPLAN_INVALID_SORT_KEY",
            PlannerErrorCode::InvalidGroupBy => "SHARDPLAN_INVALID_GROUP_BY",
            PlannerErrorCode::InvalidGraph => "SHARDPLAN_INVALID_GRAPH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Query name if the error is specific to one query
    query: Option<String>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            query: None,
        }
    }

    /// Create a missing dataset error
    pub fn missing_dataset() -> Self {
        Self::new(
            PlannerErrorCode::MissingDataset,
            "Search request must name a dataset",
        )
    }

    /// Create a queries not given error
    pub fn queries_not_given() -> Self {
        Self::new(
            PlannerErrorCode::QueriesNotGiven,
            "Search request must contain at least one query",
        )
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::InvalidRequest, reason)
    }

    /// Create an invalid output error
    pub fn invalid_output(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::InvalidOutput, reason)
    }

    /// Create an invalid sort key error
    pub fn invalid_sort_key(key: &str) -> Self {
        Self::new(
            PlannerErrorCode::InvalidSortKey,
            format!("Sort key '{}' is not an attribute name", key),
        )
    }

    /// Create an invalid group-by error
    pub fn invalid_group_by(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::InvalidGroupBy, reason)
    }

    /// Create an invalid graph error
    pub fn invalid_graph(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::InvalidGraph, reason)
    }

    /// Attaches the name of the query that caused the error
    pub fn for_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the query name if applicable
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(query) = &self.query {
            write!(f, " [query '{}']", query)?;
        }
        Ok(())
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
