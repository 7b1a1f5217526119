//! Distributed search planner
//!
//! Turns one logical search request into three messages:
//! 1. a broadcast carrying the rewritten request to every shard
//! 2. a reduce message with the deal of every element of every output
//! 3. a gather message projecting each reduced output into the response
//!
//! Planning is deterministic apart from the plan id: the same request
//! always yields the same messages, listed in request order.

use uuid::Uuid;

use crate::message::{
    reduced_name, BroadcastMessage, GatherMessage, GatherSpec, MessageGraph, OrderedMap,
    OutputDeal, ReduceMessage, SearchPlan, ERRORS_OUTPUT, SEARCH_COMMAND,
};
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::reducer::DealSpec;

use super::ast::{LogicalRequest, QuerySpec};
use super::config::PlannerConfig;
use super::errors::{PlannerError, PlannerResult};
use super::transform::plan_query;

/// Planner for search requests over a sharded dataset
pub struct DistributedSearchPlanner<'a> {
    config: &'a PlannerConfig,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a> DistributedSearchPlanner<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Counts created and rejected plans in `metrics`
    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Plans a request, returning its messages or the reason it was rejected
    pub fn plan(&self, request: &LogicalRequest) -> PlannerResult<SearchPlan> {
        let id = Uuid::new_v4();
        let plan_id = id.to_string();
        let queries = request.queries.len().to_string();
        log_event(
            Event::PlanBegin,
            &[("plan_id", plan_id.as_str()), ("queries", queries.as_str())],
        );

        match self.build(id, request) {
            Ok(plan) => {
                if let Some(metrics) = self.metrics {
                    metrics.increment_plans_created();
                }
                log_event(
                    Event::PlanComplete,
                    &[
                        ("dataset", plan.broadcast.dataset.as_str()),
                        ("plan_id", plan_id.as_str()),
                    ],
                );
                Ok(plan)
            }
            Err(err) => {
                if let Some(metrics) = self.metrics {
                    metrics.increment_plans_rejected();
                }
                log_event(
                    Event::PlanRejected,
                    &[
                        ("code", err.code().code()),
                        ("message", err.message()),
                        ("plan_id", plan_id.as_str()),
                        ("query", err.query().unwrap_or_default()),
                    ],
                );
                Err(err)
            }
        }
    }

    fn build(&self, id: Uuid, request: &LogicalRequest) -> PlannerResult<SearchPlan> {
        // 1. Dataset is mandatory
        let dataset = request
            .dataset
            .as_deref()
            .filter(|dataset| !dataset.is_empty())
            .ok_or_else(PlannerError::missing_dataset)?;

        // 2. At least one query, none using the reserved errors name
        if request.queries.is_empty() {
            return Err(PlannerError::queries_not_given());
        }
        if request.queries.contains_key(ERRORS_OUTPUT) {
            return Err(PlannerError::invalid_request(format!(
                "'{}' is reserved and cannot name a query",
                ERRORS_OUTPUT
            )));
        }

        // 3. The errors channel comes first in every listing
        let errors_reduced = reduced_name(ERRORS_OUTPUT);
        let mut outputs = vec![ERRORS_OUTPUT.to_string()];
        let mut reduced_outputs = vec![errors_reduced.clone()];
        let mut reduce_body: OrderedMap<OrderedMap<OutputDeal>> = OrderedMap::new();
        let mut gather_body: OrderedMap<GatherSpec> = OrderedMap::new();
        let mut broadcast_queries: OrderedMap<QuerySpec> = OrderedMap::new();

        reduce_body.insert(
            ERRORS_OUTPUT,
            [(errors_reduced.clone(), OutputDeal::Single(DealSpec::sum()))]
                .into_iter()
                .collect(),
        );
        gather_body.insert(errors_reduced, GatherSpec::passthrough(ERRORS_OUTPUT));

        // 4. One route per query, in request order
        for (name, query) in request.queries.iter() {
            let planned =
                plan_query(name, query, self.config).map_err(|err| err.for_query(name))?;
            let reduced = reduced_name(name);

            outputs.push(name.to_string());
            reduced_outputs.push(reduced.clone());
            reduce_body.insert(
                name,
                [(reduced.clone(), OutputDeal::PerElement(planned.deals))]
                    .into_iter()
                    .collect(),
            );
            gather_body.insert(reduced, planned.gather);
            broadcast_queries.insert(name, planned.broadcast);
        }

        let plan = SearchPlan {
            id,
            broadcast: BroadcastMessage {
                command: SEARCH_COMMAND.to_string(),
                dataset: dataset.to_string(),
                body: LogicalRequest {
                    dataset: Some(dataset.to_string()),
                    queries: broadcast_queries,
                    extra: request.extra.clone(),
                },
                outputs: outputs.clone(),
                replica: self.config.replica,
            },
            reduce: ReduceMessage {
                inputs: outputs,
                outputs: reduced_outputs.clone(),
                body: reduce_body,
            },
            gather: GatherMessage {
                inputs: reduced_outputs,
                post: true,
                body: gather_body,
            },
        };

        // 5. Wiring is checked before any message leaves the planner
        MessageGraph::build(&plan)?;
        Ok(plan)
    }
}
