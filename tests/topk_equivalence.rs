//! Top-K equivalence
//!
//! Splitting a dataset over any number of shards must not change the
//! answer: the planned, reduced and gathered response equals the response
//! of one node holding every row. This holds for grouped queries too, whose
//! groups may be split across shards.

use std::cmp::Ordering;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use shardplan::pipeline::{
    LocalPipeline, PipelineConfig, PipelineResult, ReductionTree, ShardExecutor,
};
use shardplan::planner::{
    DistributedSearchPlanner, GroupBy, LogicalRequest, OutputSpec, PlannerConfig, QuerySpec,
};
use shardplan::reducer::{compare, ReducerRegistry};

/// One shard holding rows as attribute maps
struct MemoryShard {
    rows: Vec<Map<String, Value>>,
}

fn order(a: &Map<String, Value>, b: &Map<String, Value>, keys: &[String]) -> Ordering {
    for key in keys {
        let (name, descending) = match key.strip_prefix('-') {
            Some(name) => (name, true),
            None => (key.as_str(), false),
        };
        let null = Value::Null;
        let ordering = compare(a.get(name).unwrap_or(&null), b.get(name).unwrap_or(&null));
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sorts, windows and projects rows the way a single storage node would
fn execute_query(
    rows: &[Map<String, Value>],
    keys: &[String],
    attributes: &[String],
    offset: usize,
    limit: i64,
) -> Value {
    let mut sorted: Vec<&Map<String, Value>> = rows.iter().collect();
    sorted.sort_by(|a, b| order(a, b, keys));
    let window = sorted.into_iter().skip(offset);
    let window: Vec<&Map<String, Value>> = match usize::try_from(limit) {
        Ok(limit) => window.take(limit).collect(),
        Err(_) => window.collect(),
    };
    let records: Vec<Value> = window
        .into_iter()
        .map(|row| {
            Value::Array(
                attributes
                    .iter()
                    .map(|a| row.get(a).cloned().unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .collect();
    json!({"count": rows.len(), "records": records})
}

/// Collapses rows into one `{_key, _nsubrecs}` row per distinct `key` value
fn group_rows(rows: &[Map<String, Value>], key: &str) -> Vec<Map<String, Value>> {
    let mut groups: Vec<Map<String, Value>> = Vec::new();
    for row in rows {
        let value = row.get(key).cloned().unwrap_or(Value::Null);
        match groups.iter_mut().find(|group| group["_key"] == value) {
            Some(group) => {
                let n = group["_nsubrecs"].as_i64().unwrap_or(0);
                group.insert("_nsubrecs".to_string(), json!(n + 1));
            }
            None => {
                let mut group = Map::new();
                group.insert("_key".to_string(), value);
                group.insert("_nsubrecs".to_string(), json!(1));
                groups.push(group);
            }
        }
    }
    groups
}

impl ShardExecutor for MemoryShard {
    fn execute(&self, body: &LogicalRequest) -> PipelineResult<Value> {
        let mut response = Map::new();
        response.insert("errors".to_string(), json!([]));
        for (name, query) in body.queries.iter() {
            let output = query.output.clone().unwrap_or_default();
            let keys = query
                .sort_by
                .as_ref()
                .map(|s| s.keys().to_vec())
                .unwrap_or_default();
            let offset = usize::try_from(output.offset).unwrap_or(0);
            let limit = output.limit.unwrap_or(-1);
            let rows = match &query.group_by {
                Some(group_by) => group_rows(&self.rows, group_by.key()),
                None => self.rows.clone(),
            };
            response.insert(
                name.to_string(),
                execute_query(&rows, &keys, &output.attributes, offset, limit),
            );
        }
        Ok(Value::Object(response))
    }
}

fn row(id: usize, score: i64) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("id".to_string(), json!(id));
    row.insert("score".to_string(), json!(score));
    row.insert("name".to_string(), json!(format!("user{}", id)));
    row
}

fn request(offset: i64, limit: i64) -> LogicalRequest {
    LogicalRequest::new().with_dataset("Default").with_query(
        "top",
        QuerySpec::new("User")
            .with_sort_keys(&["-score", "id"])
            .with_output(
                OutputSpec::default()
                    .with_attributes(&["name", "score"])
                    .with_offset(offset)
                    .with_limit(limit),
            ),
    )
}

fn grouped_request(offset: i64, limit: i64) -> LogicalRequest {
    LogicalRequest::new().with_dataset("Default").with_query(
        "scores",
        QuerySpec::new("User")
            .with_group_by(GroupBy::Key("score".into()))
            .with_sort_keys(&["-_nsubrecs", "_key"])
            .with_output(
                OutputSpec::default()
                    .with_attributes(&["_key", "_nsubrecs"])
                    .with_offset(offset)
                    .with_limit(limit),
            ),
    )
}

fn split(rows: &[Map<String, Value>], shard_count: usize) -> Vec<MemoryShard> {
    let mut shards: Vec<MemoryShard> =
        (0..shard_count).map(|_| MemoryShard { rows: Vec::new() }).collect();
    for (index, row) in rows.iter().enumerate() {
        shards[index % shard_count].rows.push(row.clone());
    }
    shards
}

proptest! {
    #[test]
    fn distributed_matches_single_node(
        scores in prop::collection::vec(0i64..20, 0..40),
        shard_count in 1usize..6,
        offset in 0i64..8,
        limit in prop_oneof![Just(-1i64), 0i64..8],
        sequential in any::<bool>(),
    ) {
        let rows: Vec<Map<String, Value>> =
            scores.iter().enumerate().map(|(id, score)| row(id, *score)).collect();

        let shards = split(&rows, shard_count);

        let config = PlannerConfig::default();
        let plan = DistributedSearchPlanner::new(&config)
            .plan(&request(offset, limit))
            .unwrap();

        let tree = if sequential { ReductionTree::Sequential } else { ReductionTree::Balanced };
        let registry = ReducerRegistry::builtin();
        let response = LocalPipeline::new(&registry, PipelineConfig::with_tree(tree))
            .execute(&plan, &shards)
            .unwrap();

        let keys = vec!["-score".to_string(), "id".to_string()];
        let attributes = vec!["name".to_string(), "score".to_string()];
        let expected = execute_query(&rows, &keys, &attributes, offset as usize, limit);

        prop_assert_eq!(&response["top"], &expected);
        prop_assert_eq!(&response["errors"], &json!([]));
    }

    #[test]
    fn grouped_distributed_matches_single_node(
        scores in prop::collection::vec(0i64..12, 0..40),
        shard_count in 1usize..6,
        offset in 0i64..4,
        limit in 0i64..5,
    ) {
        let rows: Vec<Map<String, Value>> =
            scores.iter().enumerate().map(|(id, score)| row(id, *score)).collect();
        let shards = split(&rows, shard_count);

        let plan = DistributedSearchPlanner::new(&PlannerConfig::default())
            .plan(&grouped_request(offset, limit))
            .unwrap();
        let registry = ReducerRegistry::builtin();
        let response = LocalPipeline::new(&registry, PipelineConfig::default())
            .execute(&plan, &shards)
            .unwrap();

        let groups = group_rows(&rows, "score");
        let keys = vec!["-_nsubrecs".to_string(), "_key".to_string()];
        let attributes = vec!["_key".to_string(), "_nsubrecs".to_string()];
        let expected = execute_query(&groups, &keys, &attributes, offset as usize, limit);

        prop_assert_eq!(&response["scores"]["count"], &json!(groups.len()));
        prop_assert_eq!(&response["scores"], &expected);
    }
}

#[test]
fn test_single_shard_is_sliced_too() {
    let shard = MemoryShard {
        rows: (0..5).map(|id| row(id, id as i64)).collect(),
    };
    let plan = DistributedSearchPlanner::new(&PlannerConfig::default())
        .plan(&request(1, 2))
        .unwrap();
    let registry = ReducerRegistry::builtin();
    let response = LocalPipeline::new(&registry, PipelineConfig::default())
        .execute(&plan, &[shard])
        .unwrap();
    assert_eq!(
        response["top"],
        json!({"count": 5, "records": [["user3", 3], ["user2", 2]]})
    );
}
