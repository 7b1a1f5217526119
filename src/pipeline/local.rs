//! In-process plan runner
//!
//! Drives a plan the way the transport would: collect one response per
//! shard, reduce them pairwise, then gather once. Used by the CLI `run`
//! command and by end-to-end tests.

use serde_json::Value;

use crate::gather::GatherCollector;
use crate::message::SearchPlan;
use crate::observability::{MetricsRegistry, ObservationScope};
use crate::reducer::{ReduceCollector, ReducerRegistry};

use super::config::{PipelineConfig, ReductionTree};
use super::errors::{PipelineError, PipelineResult};
use super::shard::ShardExecutor;

/// Runs plans against in-memory shard responses
pub struct LocalPipeline<'a> {
    registry: &'a ReducerRegistry,
    config: PipelineConfig,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a> LocalPipeline<'a> {
    pub fn new(registry: &'a ReducerRegistry, config: PipelineConfig) -> Self {
        Self {
            registry,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sends the broadcast body to every shard, then runs the responses
    pub fn execute<E: ShardExecutor>(
        &self,
        plan: &SearchPlan,
        shards: &[E],
    ) -> PipelineResult<Value> {
        let responses = shards
            .iter()
            .enumerate()
            .map(|(index, shard)| {
                shard.execute(&plan.broadcast.body).map_err(|err| match err {
                    PipelineError::Shard { .. } => err,
                    other => PipelineError::Shard {
                        shard: index,
                        message: other.to_string(),
                    },
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        self.run(plan, &responses)
    }

    /// Reduces shard responses and gathers the final response
    pub fn run(&self, plan: &SearchPlan, responses: &[Value]) -> PipelineResult<Value> {
        let plan_id = plan.id.to_string();
        let shards = responses.len().to_string();
        let scope = ObservationScope::with_fields(
            "PIPELINE",
            &[("plan_id", plan_id.as_str()), ("shards", shards.as_str())],
        );

        match self.collect(plan, responses) {
            Ok(response) => {
                scope.complete_with_fields(&[("tree", self.config.tree.as_str())]);
                Ok(response)
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    fn collect(&self, plan: &SearchPlan, responses: &[Value]) -> PipelineResult<Value> {
        if responses.is_empty() {
            return Err(PipelineError::NoResponses);
        }

        // 1. Rename every response to reduced names
        let reducer = ReduceCollector::from_plan(&plan.reduce, self.registry)?;
        let prepared: Vec<Value> = responses.iter().map(|r| reducer.prepare(r)).collect();

        // 2. Fold partials along the configured tree
        let reduced = match self.config.tree {
            ReductionTree::Sequential => self.reduce_sequential(&reducer, prepared),
            ReductionTree::Balanced => self.reduce_balanced(&reducer, prepared),
        };

        // 3. Report deals that never resolved
        let unresolved = reducer.resolution_errors().len();
        let reduced = reducer.finish(reduced);
        if let Some(metrics) = self.metrics {
            metrics.add_reduction_errors(unresolved as u64);
        }

        // 4. Project into the final response
        let outcome = GatherCollector::new(plan.gather.clone()).gather(&reduced);
        if let Some(metrics) = self.metrics {
            metrics.increment_gathers();
            metrics.add_gather_errors(outcome.failures as u64);
        }

        Ok(outcome.value)
    }

    fn reduce_pair(&self, reducer: &ReduceCollector, left: &Value, right: &Value) -> Value {
        let outcome = reducer.reduce_pair(left, right);
        if let Some(metrics) = self.metrics {
            metrics.increment_reductions();
            metrics.add_reduction_errors(outcome.failures as u64);
        }
        outcome.value
    }

    fn reduce_sequential(&self, reducer: &ReduceCollector, partials: Vec<Value>) -> Value {
        let mut partials = partials.into_iter();
        let Some(first) = partials.next() else {
            return Value::Null;
        };
        partials.fold(first, |acc, next| self.reduce_pair(reducer, &acc, &next))
    }

    fn reduce_balanced(&self, reducer: &ReduceCollector, partials: Vec<Value>) -> Value {
        let mut level = partials;
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut iter = level.into_iter();
            while let Some(left) = iter.next() {
                match iter.next() {
                    Some(right) => next.push(self.reduce_pair(reducer, &left, &right)),
                    None => next.push(left),
                }
            }
            level = next;
        }
        level.pop().unwrap_or(Value::Null)
    }
}
