//! Human-readable plan summary
//!
//! Deterministic for a given request: the plan id is the only field that
//! changes between runs.

use std::fmt;

use serde::Serialize;

use crate::message::{MessageGraph, OutputDeal, SearchPlan};
use crate::reducer::{DealSpec, UNLIMITED};

use super::errors::PlannerError;

/// Summary of one query's route through the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExplain {
    pub name: String,
    pub route: String,
    pub shard_offset: i64,
    pub shard_limit: i64,
    /// `element: deal` lines
    pub deals: Vec<String>,
    /// `element: mapper` lines
    pub mappers: Vec<String>,
}

/// Explain output for an accepted or rejected request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainPlan {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryExplain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

fn limit_text(limit: i64) -> String {
    if limit == UNLIMITED {
        "unlimited".to_string()
    } else {
        limit.to_string()
    }
}

fn deal_text(deal: &DealSpec) -> String {
    match deal {
        DealSpec::Sum { limit } if *limit == UNLIMITED => "sum".to_string(),
        DealSpec::Sum { limit } => format!("sum limit={}", limit),
        DealSpec::Sort(sort) => {
            let operators: Vec<String> = sort
                .operators
                .iter()
                .map(|op| format!("#{}{}", op.column, op.operator.symbol()))
                .collect();
            let mut text = format!("sort [{}] limit={}", operators.join(", "), limit_text(sort.limit));
            if let Some(key) = sort.key_column {
                text.push_str(&format!(" unify=#{}", key));
            }
            text
        }
        other => other.type_name().to_string(),
    }
}

impl ExplainPlan {
    /// Summarises an accepted plan
    pub fn from_plan(plan: &SearchPlan) -> Self {
        let routes = MessageGraph::build(plan)
            .map(|graph| graph.routes().to_vec())
            .unwrap_or_default();

        let queries = routes
            .iter()
            .filter_map(|route| {
                let query = plan.broadcast.body.queries.get(&route.input)?;
                let output = query.output.as_ref();
                let deals = match plan
                    .reduce
                    .body
                    .get(&route.input)
                    .and_then(|deals| deals.get(&route.reduced))
                {
                    Some(OutputDeal::PerElement(deals)) => deals
                        .iter()
                        .map(|(element, deal)| format!("{}: {}", element, deal_text(deal)))
                        .collect(),
                    Some(OutputDeal::Single(deal)) => vec![deal_text(deal)],
                    None => Vec::new(),
                };
                let mappers = plan
                    .gather
                    .body
                    .get(&route.reduced)
                    .and_then(|spec| spec.elements.as_ref())
                    .map(|elements| {
                        elements
                            .iter()
                            .map(|(element, mapper)| {
                                let mut text = format!("{}:", element);
                                if let Some(target) = &mapper.target {
                                    text.push_str(&format!(" size of {}", target));
                                    if mapper.before_window {
                                        text.push_str(" before window");
                                    }
                                }
                                if let (Some(offset), Some(limit)) = (mapper.offset, mapper.limit) {
                                    text.push_str(&format!(
                                        " offset={} limit={}",
                                        offset,
                                        limit_text(limit)
                                    ));
                                }
                                if let Some(format) = mapper.format {
                                    text.push_str(&format!(" format={}", format.as_str()));
                                }
                                if mapper.no_output {
                                    text.push_str(" hidden");
                                }
                                text
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                Some(QueryExplain {
                    name: route.input.clone(),
                    route: route.to_string(),
                    shard_offset: output.map_or(0, |o| o.offset),
                    shard_limit: output.and_then(|o| o.limit).unwrap_or(UNLIMITED),
                    deals,
                    mappers,
                })
            })
            .collect();

        Self {
            accepted: true,
            plan_id: Some(plan.id.to_string()),
            dataset: Some(plan.broadcast.dataset.clone()),
            queries,
            rejection_code: None,
            rejection_reason: None,
        }
    }

    /// Summarises a rejected request
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            plan_id: None,
            dataset: None,
            queries: Vec::new(),
            rejection_code: Some(err.code().code().to_string()),
            rejection_reason: Some(err.to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        if let Some(dataset) = &self.dataset {
            writeln!(f, "Dataset: {}", dataset)?;
        }
        for query in &self.queries {
            writeln!(f, "Query: {}", query.name)?;
            writeln!(f, "  Route: {}", query.route)?;
            writeln!(
                f,
                "  Shards return: offset={} limit={}",
                query.shard_offset,
                limit_text(query.shard_limit)
            )?;
            for deal in &query.deals {
                writeln!(f, "  Reduce {}", deal)?;
            }
            for mapper in &query.mappers {
                writeln!(f, "  Gather {}", mapper)?;
            }
        }

        Ok(())
    }
}
