//! Collector flow over wire messages
//!
//! Drives the reduce and gather collectors from serialised plan messages,
//! the way a transport receiving them would, and checks that failures stay
//! inside the output that caused them.

use serde_json::{json, Value};

use shardplan::gather::GatherCollector;
use shardplan::pipeline::{LocalPipeline, PipelineConfig};
use shardplan::planner::{
    DistributedSearchPlanner, LogicalRequest, OutputSpec, PlannerConfig, QuerySpec, RecordFormat,
};
use shardplan::reducer::{ReduceCollector, ReducerRegistry};

fn request() -> LogicalRequest {
    LogicalRequest::new()
        .with_dataset("Default")
        .with_query(
            "users",
            QuerySpec::new("User").with_sort_keys(&["-age"]).with_output(
                OutputSpec::default()
                    .with_attributes(&["name", "age"])
                    .with_format(RecordFormat::Complex)
                    .with_limit(2),
            ),
        )
        .with_query(
            "admins",
            QuerySpec::new("Admin").with_output(OutputSpec::default().with_attributes(&["name"])),
        )
}

fn messages() -> Vec<Value> {
    let plan = DistributedSearchPlanner::new(&PlannerConfig::default())
        .plan(&request())
        .unwrap();
    plan.to_json()["messages"].as_array().unwrap().clone()
}

fn shard(users: Value, admins: Value, errors: Value) -> Value {
    json!({"errors": errors, "users": users, "admins": admins})
}

fn collect(reduce_message: &Value, gather_message: &Value, responses: &[Value]) -> Value {
    let reducer = ReduceCollector::from_message(reduce_message, &ReducerRegistry::builtin()).unwrap();
    let mut partials = responses.iter().map(|r| reducer.prepare(r));
    let first = partials.next().unwrap();
    let reduced = partials.fold(first, |acc, next| reducer.reduce_pair(&acc, &next).value);
    let reduced = reducer.finish(reduced);
    GatherCollector::from_value(gather_message)
        .unwrap()
        .gather(&reduced)
        .value
}

#[test]
fn test_wire_messages_collect() {
    let messages = messages();
    let responses = vec![
        shard(
            json!({"count": 3, "records": [["a", 50, 0], ["b", 20, 0]]}),
            json!({"count": 1, "records": [["root"]]}),
            json!([]),
        ),
        shard(
            json!({"count": 2, "records": [["c", 40, 0]]}),
            json!({"count": 0, "records": []}),
            json!(["shard2: slow disk"]),
        ),
    ];

    let response = collect(&messages[1], &messages[2], &responses);
    assert_eq!(
        response,
        json!({
            "errors": ["shard2: slow disk"],
            "users": {
                "count": 5,
                "records": [{"name": "a", "age": 50}, {"name": "c", "age": 40}]
            },
            "admins": {"count": 1, "records": [["root"]]}
        })
    );
}

#[test]
fn test_type_mismatch_isolated_to_one_output() {
    let messages = messages();
    let responses = vec![
        shard(
            json!({"count": 3, "records": [["a", 50]]}),
            json!({"count": 1, "records": [["root"]]}),
            json!([]),
        ),
        shard(
            json!({"count": "three", "records": [["c", 40]]}),
            json!({"count": 2, "records": [["ops"]]}),
            json!([]),
        ),
    ];

    let response = collect(&messages[1], &messages[2], &responses);
    // best effort: the left count survives, the records still merge
    assert_eq!(response["users"]["count"], json!(3));
    assert_eq!(response["users"]["records"].as_array().unwrap().len(), 2);
    assert_eq!(response["admins"]["count"], json!(3));

    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["output"], "users_reduced");
    assert_eq!(errors[0]["code"], "SHARDPLAN_REDUCE_TYPE_MISMATCH");
}

#[test]
fn test_unknown_reduce_type_reported_once() {
    let mut messages = messages();
    messages[1]["body"]["admins"]["admins_reduced"]["count"] = json!({"type": "median"});
    let responses = vec![
        shard(json!({"count": 1, "records": []}), json!({"count": 1, "records": []}), json!([])),
        shard(json!({"count": 1, "records": []}), json!({"count": 4, "records": []}), json!([])),
        shard(json!({"count": 1, "records": []}), json!({"count": 9, "records": []}), json!([])),
    ];

    let response = collect(&messages[1], &messages[2], &responses);
    assert_eq!(response["users"]["count"], json!(3));
    assert_eq!(response["admins"]["count"], json!(1));

    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "SHARDPLAN_UNKNOWN_REDUCE_TYPE");
    assert_eq!(errors[0]["output"], "admins_reduced");
}

#[test]
fn test_unknown_gather_element_isolated() {
    let mut messages = messages();
    messages[2]["body"]["admins_reduced"]["elements"]["startTime"] = json!({});
    let responses = vec![shard(
        json!({"count": 1, "records": [["a", 1]]}),
        json!({"count": 1, "records": [["root"]]}),
        json!([]),
    )];

    let response = collect(&messages[1], &messages[2], &responses);
    assert!(response.get("admins").is_none());
    assert_eq!(response["users"]["count"], json!(1));
    assert_eq!(response["errors"][0]["code"], "SHARDPLAN_GATHER_UNKNOWN_ELEMENT");
    assert_eq!(response["errors"][0]["output"], "admins");
}

#[test]
fn test_pipeline_matches_manual_collection() {
    let plan = DistributedSearchPlanner::new(&PlannerConfig::default())
        .plan(&request())
        .unwrap();
    let responses = vec![
        shard(
            json!({"count": 3, "records": [["a", 50], ["b", 20]]}),
            json!({"count": 1, "records": [["root"]]}),
            json!([]),
        ),
        shard(
            json!({"count": 2, "records": [["c", 40]]}),
            json!({"count": 1, "records": [["ops"]]}),
            json!([]),
        ),
        shard(
            json!({"count": 2, "records": [["d", 45]]}),
            json!({"count": 0, "records": []}),
            json!(["shard3: retry"]),
        ),
    ];

    let registry = ReducerRegistry::builtin();
    let piped = LocalPipeline::new(&registry, PipelineConfig::default())
        .run(&plan, &responses)
        .unwrap();
    let encoded = plan.to_json();
    let manual = collect(&encoded["messages"][1], &encoded["messages"][2], &responses);
    assert_eq!(piped, manual);
    assert_eq!(
        piped["users"]["records"],
        json!([{"name": "a", "age": 50}, {"name": "d", "age": 45}])
    );
}
