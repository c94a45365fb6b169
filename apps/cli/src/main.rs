//! `taskdeck`: upload files to the task platform's storage service.

mod config;
mod progress;
mod upload;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use taskdeck_upload::{CancellationToken, HttpTransport, UploadCoordinator, UploadError};
use tracing_subscriber::EnvFilter;

use config::{CliConfig, Overrides, default_config_path};
use progress::UploadBar;

/// Exit code after a user abort (128 + SIGINT).
const EXIT_ABORTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Upload files to the taskdeck storage service")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, env = "TASKDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Storage API base URL.
    #[arg(long, global = true, env = "TASKDECK_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the storage API.
    #[arg(long, global = true, env = "TASKDECK_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload one file.
    Upload {
        /// Local file to upload.
        file: PathBuf,

        /// Destination path in the storage service.
        destination: String,

        /// Start a failed upload again this many times.
        #[arg(long)]
        retries: Option<u32>,

        /// Hide the progress bar and the summary.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (token masked).
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a configuration file with the effective values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,taskdeck=debug"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = CliConfig::load_from(&path)?;

    match cli.command {
        Command::Upload {
            file,
            destination,
            retries,
            quiet,
        } => {
            config.apply(Overrides {
                api_url: cli.api_url,
                api_token: cli.api_token,
                retries,
            });
            config.validate()?;
            run_upload(&config, &file, &destination, quiet).await
        }
        Command::Config { action } => {
            config.apply(Overrides {
                api_url: cli.api_url,
                api_token: cli.api_token,
                retries: None,
            });
            run_config(&config, &path, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_upload(
    config: &CliConfig,
    file: &Path,
    destination: &str,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let transport =
        HttpTransport::new(config.transport_config()).context("failed to set up HTTP transport")?;
    let coordinator = UploadCoordinator::new(Arc::new(transport), config.api_url.trim());

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| destination.to_string());
    let bar = UploadBar::new(&name, quiet);

    let cancel = CancellationToken::new();
    let interrupt = upload::cancel_on_ctrl_c(cancel.clone());

    let result =
        upload::upload_with_retries(&coordinator, file, destination, config.retries, &bar, &cancel)
            .await;
    interrupt.abort();

    match result {
        Ok(receipt) => {
            bar.finish();
            if !quiet {
                println!(
                    "uploaded {} ({} bytes, {:?}, {} part{}) to {}",
                    name,
                    receipt.total_bytes,
                    receipt.strategy,
                    receipt.part_count,
                    if receipt.part_count == 1 { "" } else { "s" },
                    receipt.destination_path,
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(UploadError::Aborted) => {
            bar.abandon();
            eprintln!("upload aborted");
            Ok(ExitCode::from(EXIT_ABORTED))
        }
        Err(e) => {
            bar.abandon();
            eprintln!("upload failed [{}]: {e}", e.kind());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_config(config: &CliConfig, path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            config.save_to(path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
