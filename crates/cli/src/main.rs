//! profile-sync - drive the profile autosave engine from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli_lib::settings;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Profile autosave - debounced, validated profile sync
#[derive(Parser)]
#[command(name = "profile-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/profile-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a timed edit script against an in-memory backend
    Run {
        /// Script file (JSON)
        script: PathBuf,
        /// Print the replay as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a handle against the local shape rules
    CheckHandle {
        /// Handle as typed
        value: String,
    },
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List the effective configuration
    List,
    /// Show an annotated example config file
    Example,
    /// Show the default config file path
    Path {
        /// Create the file from the example if missing
        #[arg(long)]
        create: bool,
    },
    /// Validate a config file
    Check {
        /// File to check (default: the --config file, then the default path)
        file: Option<PathBuf>,
    },
}

fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("Invalid log file path {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Run { script, json } => {
            let (config, _) = settings::load(explicit)?;
            cmd::run::run(config, &script, json).await
        }
        Commands::CheckHandle { value } => {
            let (config, _) = settings::load(explicit)?;
            cmd::check_handle::run(&config, &value)
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(explicit),
            ConfigCommands::Example => cmd::config::run_example(),
            ConfigCommands::Path { create } => cmd::config::run_path(create),
            ConfigCommands::Check { file } => {
                cmd::config::run_check(file.as_deref().or(explicit))
            }
        },
    }
}
