//! Structured JSON logger
//!
//! One log line is one event: a JSON object with `event` first, `severity`
//! second and the remaining fields sorted by key. `log` stamps every line
//! with a UTC `ts` field. Lines go to stderr so stdout stays reserved for
//! CLI responses.

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-pair reduction detail
    Trace = 0,
    /// Plans, gathers, config
    Info = 1,
    /// Isolated failures; the request still completes
    Warn = 2,
    /// A whole run failed
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless structured logger
pub struct Logger;

impl Logger {
    /// Logs an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut stamped: Vec<(&str, &str)> = Vec::with_capacity(fields.len() + 1);
        stamped.extend_from_slice(fields);
        stamped.push(("ts", ts.as_str()));
        let line = Self::render(severity, event, &stamped);
        let mut stderr = io::stderr().lock();
        // A lost log line must never fail the request.
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }

    /// Renders one log line, newline included
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);

        let mut line = String::with_capacity(128);
        line.push_str("{\"event\":");
        push_quoted(&mut line, event);
        line.push_str(",\"severity\":");
        push_quoted(&mut line, severity.as_str());
        for (key, value) in sorted {
            line.push(',');
            push_quoted(&mut line, key);
            line.push(':');
            push_quoted(&mut line, value);
        }
        line.push_str("}\n");
        line
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Appends `s` as a JSON string literal; control characters are escaped
fn push_quoted(line: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => line.push_str(&quoted),
        Err(_) => line.push_str("\"\""),
    }
}
