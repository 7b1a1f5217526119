//! Command line interface
//!
//! - plan: print the broadcast, reduce and gather messages of each request
//! - explain: print a summary of each request's plan
//! - run: plan each job's request and collect its recorded shard responses

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command, serve, Config, RunJob};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, read_requests, write_envelope};
