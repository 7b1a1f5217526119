//! CLI command implementations
//!
//! Every command reads JSON lines from stdin and answers each with one
//! envelope on stdout. A rejected request is answered with an error
//! envelope and the loop continues; configuration and I/O errors end the
//! process.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::message::ReplicaPolicy;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::pipeline::{LocalPipeline, PipelineConfig, ReductionTree};
use crate::planner::{DistributedSearchPlanner, ExplainPlan, LogicalRequest, PlannerConfig};
use crate::reducer::{ReducerRegistry, UNLIMITED};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{error_envelope, ok_envelope, read_requests, write_envelope, write_error};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Record limit of an output that names none (optional, default 10)
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    /// Replica policy: "random" or "all" (optional, default "random")
    #[serde(default = "default_replica")]
    pub replica: String,

    /// Reduction tree: "sequential" or "balanced" (optional, default "balanced")
    #[serde(default = "default_reduction_tree")]
    pub reduction_tree: String,
}

fn default_limit() -> i64 {
    10
}
fn default_replica() -> String {
    "random".to_string()
}
fn default_reduction_tree() -> String {
    "balanced".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            replica: default_replica(),
            reduction_tree: default_reduction_tree(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let source = path.map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
        let default_limit = config.default_limit.to_string();
        log_event(
            Event::ConfigLoaded,
            &[
                ("default_limit", default_limit.as_str()),
                ("reduction_tree", config.reduction_tree.as_str()),
                ("replica", config.replica.as_str()),
                ("source", source.as_str()),
            ],
        );
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.default_limit < UNLIMITED {
            return Err(CliError::config_error(format!(
                "Invalid default_limit: {}. Must be >= -1.",
                self.default_limit
            )));
        }
        self.planner_config()?;
        self.pipeline_config()?;
        Ok(())
    }

    pub fn planner_config(&self) -> CliResult<PlannerConfig> {
        let replica = match self.replica.as_str() {
            "random" => ReplicaPolicy::Random,
            "all" => ReplicaPolicy::All,
            other => {
                return Err(CliError::config_error(format!(
                    "Invalid replica: '{}'. Must be 'random' or 'all'.",
                    other
                )))
            }
        };
        Ok(PlannerConfig {
            default_limit: self.default_limit,
            replica,
        })
    }

    pub fn pipeline_config(&self) -> CliResult<PipelineConfig> {
        let tree = match self.reduction_tree.as_str() {
            "sequential" => ReductionTree::Sequential,
            "balanced" => ReductionTree::Balanced,
            other => {
                return Err(CliError::config_error(format!(
                    "Invalid reduction_tree: '{}'. Must be 'sequential' or 'balanced'.",
                    other
                )))
            }
        };
        Ok(PipelineConfig::with_tree(tree))
    }
}

/// One `run` input line: a request plus one recorded response per shard
#[derive(Debug, Clone, Deserialize)]
pub struct RunJob {
    pub request: Value,
    pub shards: Vec<Value>,
}

/// Main CLI entry point. This is the only function main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Runs a command over stdin and stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    let config = Config::resolve(cmd.config_path().map(|p| p.as_path()))?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match serve(&cmd, &config, stdin.lock(), &mut stdout) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Answers every line of `input` on `output`
pub fn serve<R: BufRead, W: Write>(
    cmd: &Command,
    config: &Config,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    let session = Session::new(config)?;
    for line in read_requests(input) {
        let reply = line.and_then(|value| match cmd {
            Command::Plan { .. } => session.plan(value),
            Command::Explain { .. } => session.explain(value),
            Command::Run { .. } => session.run(value),
        });
        let envelope = match reply {
            Ok(data) => ok_envelope(data),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => error_envelope(e.code_str(), e.message()),
        };
        write_envelope(output, &envelope)?;
    }
    Ok(())
}

/// State shared by every request of one process
struct Session {
    planner: PlannerConfig,
    pipeline: PipelineConfig,
    registry: ReducerRegistry,
    metrics: MetricsRegistry,
}

impl Session {
    fn new(config: &Config) -> CliResult<Self> {
        Ok(Self {
            planner: config.planner_config()?,
            pipeline: config.pipeline_config()?,
            registry: ReducerRegistry::builtin(),
            metrics: MetricsRegistry::new(),
        })
    }

    fn planner(&self) -> DistributedSearchPlanner<'_> {
        DistributedSearchPlanner::new(&self.planner).with_metrics(&self.metrics)
    }

    fn plan(&self, request: Value) -> CliResult<Value> {
        let request = LogicalRequest::from_value(request)?;
        Ok(self.planner().plan(&request)?.to_json())
    }

    fn explain(&self, request: Value) -> CliResult<Value> {
        let explain = match LogicalRequest::from_value(request) {
            Ok(request) => match self.planner().plan(&request) {
                Ok(plan) => ExplainPlan::from_plan(&plan),
                Err(e) => ExplainPlan::from_error(&e),
            },
            Err(e) => ExplainPlan::from_error(&e),
        };
        let text = explain.to_string();
        let mut data = serde_json::to_value(&explain)?;
        if let Value::Object(fields) = &mut data {
            fields.insert("text".to_string(), json!(text));
        }
        Ok(data)
    }

    fn run(&self, job: Value) -> CliResult<Value> {
        let job: RunJob = serde_json::from_value(job)?;
        let request = LogicalRequest::from_value(job.request)?;
        let plan = self.planner().plan(&request)?;
        let response = LocalPipeline::new(&self.registry, self.pipeline)
            .with_metrics(&self.metrics)
            .run(&plan, &job.shards)?;
        Ok(response)
    }
}
