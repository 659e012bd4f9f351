//! CLI module for mirrorgroup
//!
//! Provides command-line interface for:
//! - enable / disable / promote / demote / resync: one lifecycle request
//! - info / status: one decoded status read
//! - wait: poll until a lifecycle state or role is observed
//!
//! Commands reach the cluster only when the crate is built with the
//! `librbd` feature. Without it `run` still parses arguments and loads the
//! config, then every command (reads included) fails with
//! `MIRROR_CLI_UNAVAILABLE`. Library callers can drive [`run_command`]
//! with any backend, such as `MockBackend`.

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, WaitTarget};
pub use commands::{info, run_command, status, wait};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_error_to, write_response, write_response_to};

use serde_json::Value;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Parse arguments, run one command and print its result.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    if cli.verbose {
        Logger::set_min_severity(Severity::Info);
    }

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            log_event_with_fields(Event::ConfigLoaded, &[("path", &path.to_string_lossy())]);
            config
        }
        None => Config::default(),
    };
    let pool = config.resolve_pool(cli.pool.as_deref())?;

    match dispatch(&cli, &config, &pool) {
        Ok(data) => write_response(data),
        Err(err) => {
            write_error(err.code_str(), err.message())?;
            Err(err)
        }
    }
}

#[cfg(feature = "librbd")]
fn dispatch(cli: &Cli, config: &Config, pool: &str) -> CliResult<Value> {
    use crate::mirror::librbd::RadosConnection;
    use crate::mirror::MirrorGroupClient;

    let connection = RadosConnection::connect(&config.client_id, config.ceph_conf.as_deref())?;
    let client = MirrorGroupClient::new(connection.open_pool(pool)?);
    run_command(&client, &cli.command, &config.poll_config())
}

#[cfg(not(feature = "librbd"))]
fn dispatch(_cli: &Cli, _config: &Config, pool: &str) -> CliResult<Value> {
    Err(CliError::unavailable(format!(
        "cannot open pool '{}': built without the 'librbd' feature",
        pool
    )))
}
