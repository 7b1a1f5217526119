//! CLI error types
//!
//! Configuration and I/O errors are fatal: the process reports the error
//! and exits. Any other error answers one request with an error envelope.

use std::fmt;
use std::io;

use crate::pipeline::PipelineError;
use crate::planner::PlannerError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, unreadable or invalid
    ConfigError,
    /// stdin/stdout failure
    IoError,
    /// Input line is not a valid request or job
    InvalidInput,
    /// Request rejected by the planner or pipeline; carries their code
    Request(&'static str),
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SHARDPLAN_CLI_CONFIG_ERROR",
            Self::IoError => "SHARDPLAN_CLI_IO_ERROR",
            Self::InvalidInput => "SHARDPLAN_CLI_INVALID_INPUT",
            Self::Request(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Whether the error ends the process rather than one request
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, CliErrorCode::ConfigError | CliErrorCode::IoError)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<PlannerError> for CliError {
    fn from(e: PlannerError) -> Self {
        let message = match e.query() {
            Some(query) => format!("query '{}': {}", query, e.message()),
            None => e.message().to_string(),
        };
        Self::new(CliErrorCode::Request(e.code().code()), message)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self::new(CliErrorCode::Request(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
