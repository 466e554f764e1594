use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod config;
mod errors;
mod list;
mod models;
mod restore;
mod shared;

use crate::config::{CliOverrides, Config};
use crate::errors::RestoreBrowserError;
use crate::shared::cancel::{cancel_pair, spawn_signal_listener};
use crate::shared::display::DisplayFormatter;
use crate::shared::operations::OrchestrationClient;
use crate::shared::restore_workflow::RestoreWorkflow;

#[derive(Parser)]
#[command(name = "backup-restore-browser")]
#[command(about = "Browse AWS Backup recovery points and start restore jobs", long_about = None)]
struct Cli {
    /// CloudFormation stack name (default: auto-detect by prefix)
    #[arg(short, long, global = true)]
    stack: Option<String>,
    /// Backup vault name (default: first vault containing the stack name)
    #[arg(short, long, global = true)]
    vault: Option<String>,
    /// AWS region (default: AWS_REGION, AWS_DEFAULT_REGION, then us-west-2)
    #[arg(short, long, global = true)]
    region: Option<String>,
    /// Only show recovery points of this resource type (RDS, Aurora, EFS, ...)
    #[arg(short = 't', long = "type", global = true)]
    resource_type: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively browse recovery points and restore (default)
    Browse,
    /// List recovery points in the vault
    List {
        /// Return data as JSON (for scripting)
        #[arg(short, long)]
        json: bool,
    },
    /// Restore a recovery point by ARN without prompting
    Restore {
        /// Recovery point ARN
        #[arg(long = "recovery-point")]
        recovery_point: String,
        /// Follow the restore job until it finishes
        #[arg(short, long)]
        wait: bool,
    },
    /// Show the state of a restore job
    Status {
        job_id: String,
        /// Follow the restore job until it finishes
        #[arg(short, long)]
        wait: bool,
    },
    /// Generate sample .env file
    Init,
}

fn init_logging() -> Result<(), RestoreBrowserError> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all("./logs")?;

    let file_appender = rolling::daily("./logs", "restore-browser.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output (job ids, JSON), so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr.and(non_blocking))
        .with_env_filter(env_filter)
        .init();

    // Keep the guard alive
    std::mem::forget(_guard);

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if e.is_cancelled() {
            warn!("Interrupted, exiting");
            std::process::exit(130);
        }
        DisplayFormatter::display_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RestoreBrowserError> {
    let command = cli.command.unwrap_or(Commands::Browse);
    if let Commands::Init = command {
        return init_env_file();
    }

    let config = Config::load(CliOverrides {
        stack: cli.stack,
        vault: cli.vault,
        region: cli.region,
        resource_type: cli.resource_type,
    })?;

    let (handle, cancel) = cancel_pair();
    spawn_signal_listener(handle);

    let client = OrchestrationClient::from_config(&config, cancel.clone()).await?;
    let workflow = RestoreWorkflow::new(config, client, cancel);

    match command {
        Commands::Browse => restore::restore_interactive(&workflow).await,
        Commands::List { json } => list::list_recovery_points(&workflow, json).await,
        Commands::Restore {
            recovery_point,
            wait,
        } => restore::restore_recovery_point(&workflow, &recovery_point, wait).await,
        Commands::Status { job_id, wait } => restore::show_restore_status(&workflow, &job_id, wait).await,
        Commands::Init => Ok(()),
    }
}

fn init_env_file() -> Result<(), RestoreBrowserError> {
    use std::fs;
    use std::path::Path;

    let env_file = ".env";
    if Path::new(env_file).exists() {
        warn!(file = %env_file, ".env file already exists, not overwriting");
        return Ok(());
    }

    let content = r#"# AWS Backup Recovery Browser Configuration
# Command line flags override these values

# Region (falls back to AWS_DEFAULT_REGION, then us-west-2)
AWS_REGION=us-west-2

# Stack and vault (auto-detected when unset)
# BACKUP_STACK_NAME=OpenemrEcsStack
# BACKUP_VAULT_NAME=OpenemrEcsStack-vault-xxxx

# Stack name prefix used for auto-detection
# BACKUP_STACK_PREFIX=OpenemrEcs

# Stack output holding the database cluster endpoint
# BACKUP_DATABASE_OUTPUT=DatabaseEndpoint

# Only show one resource type (RDS, Aurora, EFS)
# BACKUP_RESOURCE_TYPE=EFS

# Seconds between restore job status checks
# RESTORE_POLL_INTERVAL_SECS=15
"#;

    fs::write(env_file, content)?;
    info!(file = %env_file, "Created sample .env file, edit it for your deployment");

    Ok(())
}
