//! Name wiring between the messages of a plan
//!
//! Invariants checked before a plan leaves the planner:
//! - broadcast outputs, reduce inputs, reduce outputs and gather inputs
//!   are each free of duplicates
//! - every reduce input is exactly one broadcast output and vice versa
//! - the reduce body is keyed by the reduce inputs and maps each to
//!   exactly one reduce output
//! - gather inputs equal the reduce outputs, and every reduce output is
//!   exactly one key of the gather body

use std::collections::HashSet;
use std::fmt;

use crate::planner::{PlannerError, PlannerResult};

use super::plan::SearchPlan;

/// One named hop of a result through the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Broadcast output / reduce input
    pub input: String,
    /// Reduce output / gather input
    pub reduced: String,
    /// Key of the final response
    pub output: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} -> {}", self.input, self.reduced, self.output)
    }
}

/// Validated wiring of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGraph {
    routes: Vec<Route>,
}

fn unique<'a>(names: &'a [String], list: &str) -> PlannerResult<HashSet<&'a str>> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(PlannerError::invalid_graph(format!(
                "'{}' appears twice in {}",
                name, list
            )));
        }
    }
    Ok(seen)
}

impl MessageGraph {
    /// Validates the wiring of a plan and returns its routes in reduce
    /// input order
    pub fn build(plan: &SearchPlan) -> PlannerResult<Self> {
        let broadcast_outputs = unique(&plan.broadcast.outputs, "broadcast outputs")?;
        let reduce_inputs = unique(&plan.reduce.inputs, "reduce inputs")?;
        let reduce_outputs = unique(&plan.reduce.outputs, "reduce outputs")?;
        unique(&plan.gather.inputs, "gather inputs")?;

        if broadcast_outputs != reduce_inputs {
            return Err(PlannerError::invalid_graph(
                "reduce inputs do not match broadcast outputs",
            ));
        }
        if plan.gather.inputs != plan.reduce.outputs {
            return Err(PlannerError::invalid_graph(
                "gather inputs do not match reduce outputs",
            ));
        }
        if plan.reduce.body.len() != plan.reduce.inputs.len() {
            return Err(PlannerError::invalid_graph(
                "reduce body is not keyed by the reduce inputs",
            ));
        }
        if plan.gather.body.len() != reduce_outputs.len() {
            return Err(PlannerError::invalid_graph(
                "gather body is not keyed by the reduce outputs",
            ));
        }

        let mut claimed: HashSet<&str> = HashSet::with_capacity(reduce_outputs.len());
        let mut routes = Vec::with_capacity(plan.reduce.inputs.len());
        for input in &plan.reduce.inputs {
            let deals = plan.reduce.body.get(input).ok_or_else(|| {
                PlannerError::invalid_graph(format!("reduce body has no entry for '{}'", input))
            })?;
            let mut outputs = deals.keys();
            let reduced = match (outputs.next(), outputs.next()) {
                (Some(reduced), None) => reduced,
                _ => {
                    return Err(PlannerError::invalid_graph(format!(
                        "'{}' must reduce into exactly one output",
                        input
                    )))
                }
            };
            if !reduce_outputs.contains(reduced) || !claimed.insert(reduced) {
                return Err(PlannerError::invalid_graph(format!(
                    "'{}' is not a distinct reduce output",
                    reduced
                )));
            }
            let spec = plan.gather.body.get(reduced).ok_or_else(|| {
                PlannerError::invalid_graph(format!("gather body has no entry for '{}'", reduced))
            })?;
            routes.push(Route {
                input: input.clone(),
                reduced: reduced.to_string(),
                output: spec.output.clone(),
            });
        }

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
