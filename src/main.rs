//! `rcloadenv`: run a command with Runtime Configurator variables in its environment.
//!
//! Usage:
//!   rcloadenv [options] <config-name> -- <command> [args...]
//!   eval "$(rcloadenv [options] <config-name>)"

use clap::Parser;
use rcloadenv::client::{RuntimeConfigClient, into_relative_map};
use rcloadenv::error::{Result, RuntimeConfigError};
use rcloadenv::export::{VariableFilter, export_line, merge_into_env};
use rcloadenv::project::project_id_from_env;
use std::collections::BTreeMap;
use std::process::{Command, ExitCode};
use tracing_subscriber::EnvFilter;

/// Populate the environment from a Runtime Configurator config and run a command.
///
/// Without a command, prints `export` statements for the variables that would be set.
#[derive(Parser, Debug)]
#[command(name = "rcloadenv")]
#[command(version, about, long_about = None)]
struct Args {
    /// Project to read runtime config from (defaults to GOOGLE_CLOUD_PROJECT / GCLOUD_PROJECT)
    #[arg(short, long, alias = "projectId")]
    project: Option<String>,

    /// Runtime-config variables to exclude, comma delimited (paths relative to `variables/`)
    #[arg(short = 'E', long, value_delimiter = ',')]
    except: Vec<String>,

    /// Runtime-config variables to include, comma delimited (paths relative to `variables/`)
    #[arg(short = 'O', long, value_delimiter = ',')]
    only: Vec<String>,

    /// Let config values override existing environment variables
    #[arg(short = 'o', long = "override")]
    override_existing: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Config name in the Runtime Configurator API
    config_name: String,

    /// Command to execute, after `--`
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("rcloadenv: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("rcloadenv=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout is reserved for export statements
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let project = match args.project {
        Some(project) => project,
        None => project_id_from_env()?,
    };

    let client = RuntimeConfigClient::builder().build()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    tracing::info!(project = %project, config = %args.config_name, "Fetching runtime configuration");
    let variables = runtime.block_on(client.list_variables(&project, &args.config_name))?;
    let variables = into_relative_map(variables);

    let filter = VariableFilter::new().only(args.only).except(args.except);
    let mut env: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    let written = merge_into_env(&variables, &mut env, &filter, args.override_existing);
    let assignments: Vec<(&String, &String)> = written
        .iter()
        .filter_map(|key| env.get_key_value(key))
        .collect();

    let Some((program, program_args)) = args.command.split_first() else {
        for (key, value) in assignments {
            println!("{}", export_line(key, value));
        }
        return Ok(ExitCode::SUCCESS);
    };

    let mut command = Command::new(program);
    command.args(program_args).envs(assignments);
    exec(command, program)
}

#[cfg(unix)]
fn exec(mut command: Command, program: &str) -> Result<ExitCode> {
    use std::os::unix::process::CommandExt;

    // Only returns on failure.
    let err = command.exec();
    Err(RuntimeConfigError::Other(format!(
        "Failed to run {}: {}",
        program, err
    )))
}

#[cfg(not(unix))]
fn exec(mut command: Command, program: &str) -> Result<ExitCode> {
    let status = command.status().map_err(|e| {
        RuntimeConfigError::Other(format!("Failed to run {}: {}", program, e))
    })?;
    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
