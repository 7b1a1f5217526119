//! Receiving side of a gather message
//!
//! Projects every reduced output named in the gather body into the final
//! response, in body order. An output that cannot be projected is left out
//! of the response and reported on the `errors` output instead; its
//! siblings are still gathered.

use serde_json::{Map, Value};

use crate::message::{GatherMessage, ERRORS_OUTPUT};
use crate::observability::{log_event, Event};

use super::errors::{GatherError, GatherResult};
use super::projector::project;

/// Result of gathering a reduced response
#[derive(Debug, Clone, PartialEq)]
pub struct GatherOutcome {
    /// Response keyed by caller-facing output names
    pub value: Value,
    /// Number of outputs that could not be projected
    pub failures: usize,
}

/// Applies the projections of one gather message
#[derive(Debug, Clone)]
pub struct GatherCollector {
    message: GatherMessage,
}

impl GatherCollector {
    pub fn new(message: GatherMessage) -> Self {
        Self { message }
    }

    /// Builds a collector from a raw gather message
    pub fn from_value(message: &Value) -> GatherResult<Self> {
        let mut fields = match message {
            Value::Object(fields) => fields.clone(),
            other => {
                return Err(GatherError::InvalidSpec(format!(
                    "gather message must be an object, got {}",
                    other
                )))
            }
        };
        fields.remove("type");
        let message = serde_json::from_value(Value::Object(fields))
            .map_err(|e| GatherError::InvalidSpec(e.to_string()))?;
        Ok(Self::new(message))
    }

    pub fn message(&self) -> &GatherMessage {
        &self.message
    }

    /// Builds the final response from a fully reduced response
    pub fn gather(&self, reduced: &Value) -> GatherOutcome {
        let mut response = Map::new();
        let mut failures: Vec<(String, GatherError)> = Vec::new();

        for (name, spec) in self.message.body.iter() {
            let value = reduced.get(name).unwrap_or(&Value::Null);
            match project(spec, value) {
                Ok(projected) => {
                    response.insert(spec.output.clone(), projected);
                }
                Err(err) => {
                    log_event(
                        Event::GatherOutputFailed,
                        &[
                            ("code", err.code()),
                            ("message", err.to_string().as_str()),
                            ("output", spec.output.as_str()),
                        ],
                    );
                    failures.push((spec.output.clone(), err));
                }
            }
        }

        if !failures.is_empty() {
            let slot = response
                .entry(ERRORS_OUTPUT.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(entries) = slot {
                entries.extend(
                    failures
                        .iter()
                        .map(|(output, err)| err.to_error_entry(output)),
                );
            }
        }

        let outputs = response.len().to_string();
        let failed = failures.len().to_string();
        log_event(
            Event::GatherComplete,
            &[("failures", failed.as_str()), ("outputs", outputs.as_str())],
        );

        GatherOutcome {
            value: Value::Object(response),
            failures: failures.len(),
        }
    }
}
