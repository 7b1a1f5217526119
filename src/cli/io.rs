//! JSON line I/O for the CLI
//!
//! - Input: one JSON object per stdin line
//! - Output: one JSON envelope per stdout line
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Reads JSON values from `reader`, one per non-blank line
pub fn read_requests<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<Value>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str(&line).map_err(CliError::from)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// `{"status": "ok", "data": ...}`
pub fn ok_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// `{"status": "error", "code": ..., "message": ...}`
pub fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Writes one envelope as a single line and flushes
pub fn write_envelope<W: Write>(writer: &mut W, envelope: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, envelope)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes an error envelope to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_envelope(&mut io::stdout(), &error_envelope(code, message))
}
