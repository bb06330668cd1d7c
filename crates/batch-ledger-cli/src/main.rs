// crates/batch-ledger-cli/src/main.rs
// ============================================================================
// Module: Batch Ledger CLI Entry Point
// Description: Command dispatcher for batch ledger inspection and purge.
// Purpose: Give operators a JSON view over a SQLite batch ledger.
// Dependencies: batch-ledger-config, batch-ledger-core, batch-ledger-store-sqlite, clap, serde_json
// ============================================================================

//! ## Overview
//! `batch-ledger` opens the configured `SQLite` ledger and answers one query
//! per invocation: job instances and their executions, step executions,
//! status records, checkpoint tokens, and store readiness. `purge` is the
//! only command that writes. Results are printed as JSON on stdout; errors
//! go to stderr with a failure exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use batch_ledger_cli::logging;
use batch_ledger_config::LedgerConfig;
use batch_ledger_core::CheckpointLedger;
use batch_ledger_core::ExecutionHistoryStore;
use batch_ledger_core::JobExecutionId;
use batch_ledger_core::JobInstance;
use batch_ledger_core::JobInstanceId;
use batch_ledger_core::LedgerError;
use batch_ledger_core::LedgerStore;
use batch_ledger_core::StatusTracker;
use batch_ledger_store_sqlite::SqliteLedgerStore;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size for `instances --name`.
const DEFAULT_PAGE_SIZE: usize = 50;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "batch-ledger", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (overrides `BATCH_LEDGER_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Ledger database path; skips the config file unless `--config` is given.
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List job instances, newest first when filtered by name.
    Instances {
        /// Job name filter; without it every non-partition instance is listed.
        #[arg(long)]
        name: Option<String>,
        /// Application tag filter (requires `--name`).
        #[arg(long, requires = "name")]
        app_tag: Option<String>,
        /// Number of instances to skip.
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Maximum number of instances to return.
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: usize,
    },
    /// List the executions of a job instance, newest first.
    Executions {
        /// Job instance id.
        #[arg(value_parser = parse_instance_id)]
        instance: JobInstanceId,
    },
    /// Show one job execution.
    Execution {
        /// Job execution id.
        #[arg(value_parser = parse_execution_id)]
        execution: JobExecutionId,
    },
    /// List the step executions of a job execution.
    Steps {
        /// Job execution id.
        #[arg(value_parser = parse_execution_id)]
        execution: JobExecutionId,
    },
    /// Show the latest step execution per step name of a job instance.
    RecentSteps {
        /// Job instance id.
        #[arg(value_parser = parse_instance_id)]
        instance: JobInstanceId,
    },
    /// List running execution ids of a job name.
    Running {
        /// Job name.
        job_name: String,
    },
    /// Show the job status record of a job instance.
    JobStatus {
        /// Job instance id.
        #[arg(value_parser = parse_instance_id)]
        instance: JobInstanceId,
    },
    /// Show the step status record of a step within a job instance.
    StepStatus {
        /// Job instance id.
        #[arg(value_parser = parse_instance_id)]
        instance: JobInstanceId,
        /// Step name.
        step: String,
    },
    /// Show the reader and writer checkpoint tokens of a step.
    Checkpoint {
        /// Job instance id.
        #[arg(value_parser = parse_instance_id)]
        instance: JobInstanceId,
        /// Step name.
        step: String,
    },
    /// Delete every record owned by an application tag.
    Purge {
        /// Application tag.
        app_tag: String,
    },
    /// Check that the ledger database answers reads and writes.
    Readiness,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// One entry of the unfiltered instance listing.
#[derive(Debug, Serialize)]
struct InstanceName {
    /// Job instance id.
    id: JobInstanceId,
    /// Job name.
    name: String,
}

/// Instance listing filtered by name.
#[derive(Debug, Serialize)]
struct InstancePage {
    /// Total instances matching the filter.
    total: u64,
    /// Requested page.
    instances: Vec<JobInstance>,
}

/// Readiness probe result.
#[derive(Debug, Serialize)]
struct Readiness {
    /// Always `"ready"` when printed.
    status: &'static str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<LedgerError> for CliError {
    fn from(error: LedgerError) -> Self {
        Self::new(error.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Loads configuration, opens the ledger, and dispatches the command.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = resolve_config(cli.config.as_deref(), cli.db)?;
    logging::init(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    let store = SqliteLedgerStore::new(config.store.clone()).map_err(|err| {
        CliError::new(format!("cannot open ledger {}: {err}", config.store.path.display()))
    })?;
    debug!(path = %config.store.path.display(), "ledger opened");
    dispatch(&store, cli.command)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the effective configuration from `--config` and `--db`.
fn resolve_config(
    config_path: Option<&std::path::Path>,
    db: Option<PathBuf>,
) -> CliResult<LedgerConfig> {
    let mut config = match (config_path, &db) {
        (None, Some(path)) => LedgerConfig::for_store_path(path.clone()),
        (path, _) => LedgerConfig::load(path).map_err(|err| CliError::new(err.to_string()))?,
    };
    if let Some(path) = db {
        config.store.path = path;
    }
    config.validate().map_err(|err| CliError::new(err.to_string()))?;
    Ok(config)
}

/// Runs one command against `store`.
fn dispatch<S: LedgerStore + ?Sized>(store: &S, command: Commands) -> CliResult<()> {
    match command {
        Commands::Instances {
            name,
            app_tag,
            start,
            count,
        } => command_instances(store, name.as_deref(), app_tag.as_deref(), start, count),
        Commands::Executions {
            instance,
        } => write_json(&store.job_executions_for_instance(instance)?),
        Commands::Execution {
            execution,
        } => {
            let found = store.get_job_execution(execution)?.ok_or_else(|| {
                LedgerError::NoSuchExecution(format!("job execution {execution}"))
            })?;
            write_json(&found)
        }
        Commands::Steps {
            execution,
        } => write_json(&store.step_executions_for_job_execution(execution)?),
        Commands::RecentSteps {
            instance,
        } => write_json(&store.most_recent_step_executions(instance)?),
        Commands::Running {
            job_name,
        } => write_json(&store.running_execution_ids(&job_name)?),
        Commands::JobStatus {
            instance,
        } => write_json(&StatusTracker::new(store).get_job_status(instance)?),
        Commands::StepStatus {
            instance,
            step,
        } => write_json(&StatusTracker::new(store).get_step_status(instance, &step)?),
        Commands::Checkpoint {
            instance,
            step,
        } => write_json(&CheckpointLedger::new(store).get(instance, &step)?),
        Commands::Purge {
            app_tag,
        } => write_json(&store.purge(&app_tag)?),
        Commands::Readiness => {
            store.readiness()?;
            write_json(&Readiness {
                status: "ready",
            })
        }
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Lists instances either by name (paged) or all non-partition instances.
fn command_instances<S: ExecutionHistoryStore + ?Sized>(
    store: &S,
    name: Option<&str>,
    app_tag: Option<&str>,
    start: usize,
    count: usize,
) -> CliResult<()> {
    let Some(name) = name else {
        let listing: Vec<InstanceName> = store
            .external_job_instances()?
            .into_iter()
            .map(|(id, name)| InstanceName {
                id,
                name,
            })
            .collect();
        return write_json(&listing);
    };
    let total = store.job_instance_count(name, app_tag)?;
    let mut instances = Vec::new();
    for id in store.job_instance_ids(name, app_tag, start, count)? {
        let instance = store
            .get_job_instance(id)?
            .ok_or_else(|| LedgerError::NotFound(format!("job instance {id}")))?;
        instances.push(instance);
    }
    write_json(&InstancePage {
        total,
        instances,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a job instance id argument.
fn parse_instance_id(value: &str) -> Result<JobInstanceId, String> {
    parse_raw_id(value).and_then(|raw| {
        JobInstanceId::from_raw(raw).ok_or_else(|| "job instance id must be positive".to_string())
    })
}

/// Parses a job execution id argument.
fn parse_execution_id(value: &str) -> Result<JobExecutionId, String> {
    parse_raw_id(value).and_then(|raw| {
        JobExecutionId::from_raw(raw).ok_or_else(|| "job execution id must be positive".to_string())
    })
}

/// Parses an unsigned decimal id.
fn parse_raw_id(value: &str) -> Result<u64, String> {
    value.trim().parse::<u64>().map_err(|err| format!("invalid id {value}: {err}"))
}

/// Serializes `value` as pretty JSON on stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
