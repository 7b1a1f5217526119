//! Receiving side of a reduce message
//!
//! A `ReduceCollector` is built once per reduce message. It renames a shard
//! response from broadcast names to reduced names (`prepare`), combines two
//! partial responses output by output (`reduce_pair`) and, once all
//! partials are folded, reports deals that could not be resolved
//! (`finish`).
//!
//! Failures are isolated per output: the failing output keeps its left
//! value (the right one when the left is absent), an entry is appended to
//! the errors output, and the sibling outputs reduce normally.

use serde_json::{Map, Value};

use crate::message::{ReduceMessage, ERRORS_OUTPUT};
use crate::observability::{log_event, Event};
use crate::planner::Element;

use super::deal::DealSpec;
use super::errors::{ReduceError, ReduceResult};
use super::reducer::reduce;
use super::registry::ReducerRegistry;

#[derive(Debug, Clone)]
enum ResolvedDeal {
    Single(ReduceResult<DealSpec>),
    PerElement(Vec<(String, ReduceResult<DealSpec>)>),
}

#[derive(Debug, Clone)]
struct ReduceRoute {
    input: String,
    output: String,
    deal: ResolvedDeal,
}

/// Result of combining two partial responses
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceOutcome {
    /// Combined response keyed by reduced output name
    pub value: Value,
    /// Number of outputs (or elements) that failed to reduce
    pub failures: usize,
}

/// Applies the deals of one reduce message
#[derive(Debug, Clone)]
pub struct ReduceCollector {
    routes: Vec<ReduceRoute>,
    errors_output: Option<String>,
}

fn resolve_output(registry: &ReducerRegistry, descriptor: &Value) -> ReduceResult<ResolvedDeal> {
    let Value::Object(fields) = descriptor else {
        return Err(ReduceError::InvalidMessage(format!(
            "deal {} is not an object",
            descriptor
        )));
    };
    if fields.contains_key("type") {
        return Ok(ResolvedDeal::Single(registry.resolve(descriptor)));
    }

    let deals = fields
        .iter()
        .map(|(element, descriptor)| {
            let deal = match Element::parse(element) {
                Some(_) => registry.resolve(descriptor),
                None => Err(ReduceError::UnknownElement(element.clone())),
            };
            (element.clone(), deal)
        })
        .collect();
    Ok(ResolvedDeal::PerElement(deals))
}

fn error_entries(failures: &[(String, ReduceError)]) -> impl Iterator<Item = Value> + '_ {
    failures.iter().map(|(output, err)| err.to_error_entry(output))
}

fn best_effort(left: &Value, right: &Value) -> Value {
    if left.is_null() {
        right.clone()
    } else {
        left.clone()
    }
}

impl ReduceCollector {
    /// Resolves every deal of a raw reduce message.
    ///
    /// Unknown deal types and element names are kept as per-output
    /// failures; only a message that is not shaped like a reduce message
    /// is rejected as a whole.
    pub fn from_message(message: &Value, registry: &ReducerRegistry) -> ReduceResult<Self> {
        let body = message
            .get("body")
            .and_then(Value::as_object)
            .ok_or_else(|| ReduceError::InvalidMessage("missing \"body\" object".into()))?;

        let mut routes = Vec::new();
        let mut errors_output = None;
        for (input, outputs) in body {
            let outputs = outputs.as_object().ok_or_else(|| {
                ReduceError::InvalidMessage(format!("body of '{}' is not an object", input))
            })?;
            for (output, descriptor) in outputs {
                if input == ERRORS_OUTPUT {
                    errors_output = Some(output.clone());
                }
                routes.push(ReduceRoute {
                    input: input.clone(),
                    output: output.clone(),
                    deal: resolve_output(registry, descriptor)?,
                });
            }
        }

        Ok(Self {
            routes,
            errors_output,
        })
    }

    /// Builds a collector from a typed reduce message
    pub fn from_plan(message: &ReduceMessage, registry: &ReducerRegistry) -> ReduceResult<Self> {
        let raw = serde_json::to_value(message)
            .map_err(|e| ReduceError::InvalidMessage(e.to_string()))?;
        Self::from_message(&raw, registry)
    }

    /// Reduced output names in message order
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.output.as_str())
    }

    /// Renames a shard response to reduced output names.
    ///
    /// Per-element outputs keep only the elements that have a deal.
    pub fn prepare(&self, response: &Value) -> Value {
        let mut prepared = Map::new();
        for route in &self.routes {
            let value = response.get(&route.input).cloned().unwrap_or(Value::Null);
            let value = match (&route.deal, value) {
                (ResolvedDeal::PerElement(deals), Value::Object(mut elements)) => {
                    let kept: Map<String, Value> = deals
                        .iter()
                        .filter_map(|(name, _)| elements.remove(name).map(|v| (name.clone(), v)))
                        .collect();
                    Value::Object(kept)
                }
                (_, value) => value,
            };
            prepared.insert(route.output.clone(), value);
        }
        Value::Object(prepared)
    }

    /// Combines two prepared partial responses
    pub fn reduce_pair(&self, left: &Value, right: &Value) -> ReduceOutcome {
        let mut combined = Map::new();
        let mut failures: Vec<(String, ReduceError)> = Vec::new();

        for route in &self.routes {
            let l = left.get(&route.output).unwrap_or(&Value::Null);
            let r = right.get(&route.output).unwrap_or(&Value::Null);
            let value = match &route.deal {
                ResolvedDeal::Single(Ok(deal)) => match reduce(deal, l, r) {
                    Ok(value) => value,
                    Err(err) => {
                        failures.push((route.output.clone(), err));
                        best_effort(l, r)
                    }
                },
                // Reported once by `finish`.
                ResolvedDeal::Single(Err(_)) => best_effort(l, r),
                ResolvedDeal::PerElement(deals) => {
                    self.reduce_elements(&route.output, deals, l, r, &mut failures)
                }
            };
            combined.insert(route.output.clone(), value);
        }

        for (output, err) in &failures {
            log_event(
                Event::ReduceOutputFailed,
                &[
                    ("code", err.code()),
                    ("message", err.to_string().as_str()),
                    ("output", output.as_str()),
                ],
            );
        }
        self.append_errors(&mut combined, error_entries(&failures));
        log_event(
            Event::ReduceComplete,
            &[("failures", failures.len().to_string().as_str())],
        );

        ReduceOutcome {
            value: Value::Object(combined),
            failures: failures.len(),
        }
    }

    fn reduce_elements(
        &self,
        output: &str,
        deals: &[(String, ReduceResult<DealSpec>)],
        left: &Value,
        right: &Value,
        failures: &mut Vec<(String, ReduceError)>,
    ) -> Value {
        let mut elements = Map::new();
        for (name, deal) in deals {
            let l = left.get(name).unwrap_or(&Value::Null);
            let r = right.get(name).unwrap_or(&Value::Null);
            if l.is_null() && r.is_null() {
                continue;
            }
            let value = match deal {
                Ok(deal) => reduce(deal, l, r).unwrap_or_else(|err| {
                    failures.push((output.to_string(), err));
                    best_effort(l, r)
                }),
                Err(_) => best_effort(l, r),
            };
            elements.insert(name.clone(), value);
        }
        Value::Object(elements)
    }

    /// Deals that could not be resolved, as errors-output entries
    pub fn resolution_errors(&self) -> Vec<Value> {
        let mut entries = Vec::new();
        for route in &self.routes {
            match &route.deal {
                ResolvedDeal::Single(Err(err)) => entries.push(err.to_error_entry(&route.output)),
                ResolvedDeal::PerElement(deals) => entries.extend(
                    deals
                        .iter()
                        .filter_map(|(_, deal)| deal.as_ref().err())
                        .map(|err| err.to_error_entry(&route.output)),
                ),
                ResolvedDeal::Single(Ok(_)) => {}
            }
        }
        entries
    }

    /// Completes a fully folded response by reporting unresolved deals
    pub fn finish(&self, reduced: Value) -> Value {
        let entries = self.resolution_errors();
        if entries.is_empty() {
            return reduced;
        }
        for entry in &entries {
            log_event(
                Event::ReduceOutputFailed,
                &[
                    ("code", entry["code"].as_str().unwrap_or_default()),
                    ("output", entry["output"].as_str().unwrap_or_default()),
                ],
            );
        }
        let mut combined = match reduced {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.append_errors(&mut combined, entries.into_iter());
        Value::Object(combined)
    }

    fn append_errors(&self, combined: &mut Map<String, Value>, entries: impl Iterator<Item = Value>) {
        let mut entries = entries.peekable();
        if entries.peek().is_none() {
            return;
        }
        let Some(errors_output) = &self.errors_output else {
            return;
        };
        let slot = combined
            .entry(errors_output.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.extend(entries),
            // An errors output that is not a list already failed to reduce;
            // replace it rather than lose the new entries.
            other => *other = Value::Array(entries.collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> Value {
        json!({
            "type": "search_reduce",
            "inputs": ["errors", "users"],
            "outputs": ["errors_reduced", "users_reduced"],
            "body": {
                "errors": {"errors_reduced": {"type": "sum", "limit": -1}},
                "users": {
                    "users_reduced": {
                        "count": {"type": "sum", "limit": -1},
                        "records": {
                            "type": "sort",
                            "operators": [{"column": 1, "operator": ">"}],
                            "limit": 2
                        }
                    }
                }
            }
        })
    }

    fn collector(message: &Value) -> ReduceCollector {
        ReduceCollector::from_message(message, &ReducerRegistry::builtin()).unwrap()
    }

    #[test]
    fn test_prepare_renames_and_filters() {
        let collector = collector(&message());
        let prepared = collector.prepare(&json!({
            "errors": [],
            "users": {"count": 2, "records": [["a", 3]], "startTime": "now"}
        }));
        assert_eq!(
            prepared,
            json!({
                "errors_reduced": [],
                "users_reduced": {"count": 2, "records": [["a", 3]]}
            })
        );
        assert_eq!(
            collector.outputs().collect::<Vec<_>>(),
            vec!["errors_reduced", "users_reduced"]
        );
    }

    #[test]
    fn test_reduce_pair_merges_every_output() {
        let collector = collector(&message());
        let left = collector.prepare(&json!({
            "errors": [],
            "users": {"count": 3, "records": [["a", 9], ["b", 5]]}
        }));
        let right = collector.prepare(&json!({
            "errors": ["shard2 slow"],
            "users": {"count": 4, "records": [["c", 7], ["d", 1]]}
        }));

        let outcome = collector.reduce_pair(&left, &right);
        assert_eq!(outcome.failures, 0);
        assert_eq!(
            outcome.value,
            json!({
                "errors_reduced": ["shard2 slow"],
                "users_reduced": {"count": 7, "records": [["a", 9], ["c", 7]]}
            })
        );
    }

    #[test]
    fn test_failure_is_isolated_to_its_output() {
        let collector = collector(&message());
        let left = json!({
            "errors_reduced": [],
            "users_reduced": {"count": 3, "records": [["a", 9]]}
        });
        let right = json!({
            "errors_reduced": [],
            "users_reduced": {"count": [1], "records": [["c", 7]]}
        });

        let outcome = collector.reduce_pair(&left, &right);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.value["users_reduced"]["count"], json!(3));
        assert_eq!(
            outcome.value["users_reduced"]["records"],
            json!([["a", 9], ["c", 7]])
        );
        let errors = outcome.value["errors_reduced"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["output"], "users_reduced");
        assert_eq!(errors[0]["code"], "SHARDPLAN_REDUCE_TYPE_MISMATCH");
    }

    #[test]
    fn test_unknown_type_reported_once_by_finish() {
        let mut raw = message();
        raw["body"]["users"]["users_reduced"]["count"] = json!({"type": "median"});
        let collector = collector(&raw);

        let left = json!({"errors_reduced": [], "users_reduced": {"count": 3, "records": []}});
        let right = json!({"errors_reduced": [], "users_reduced": {"count": 4, "records": []}});
        let outcome = collector.reduce_pair(&left, &right);
        assert_eq!(outcome.failures, 0);
        assert_eq!(outcome.value["users_reduced"]["count"], json!(3));

        let finished = collector.finish(outcome.value);
        let errors = finished["errors_reduced"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["code"], "SHARDPLAN_UNKNOWN_REDUCE_TYPE");
        assert_eq!(errors[0]["message"], "Unknown reduce type: median");
    }

    #[test]
    fn test_unknown_element_is_per_output() {
        let mut raw = message();
        raw["body"]["users"]["users_reduced"]["startTime"] = json!({"type": "sum"});
        let collector = collector(&raw);
        let errors = collector.resolution_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["code"], "SHARDPLAN_UNKNOWN_ELEMENT");
        assert_eq!(errors[0]["output"], "users_reduced");
    }

    #[test]
    fn test_malformed_message_rejected() {
        let err = ReduceCollector::from_message(&json!({"inputs": []}), &ReducerRegistry::builtin())
            .unwrap_err();
        assert_eq!(err.code(), "SHARDPLAN_INVALID_REDUCE_MESSAGE");
    }
}
