use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use cdship_core::ShipConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "cdship",
    about = "cdship — package a directory and roll it out with AWS CodeDeploy",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to cdship.toml (default: ./cdship.toml, or $CDSHIP_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the application to a deployment group.
    ///
    /// Prepares and zips the source directory, uploads it to S3 and starts a
    /// CodeDeploy deployment, printing every status change until it finishes.
    Deploy {
        /// The deployment group's name
        #[arg(short, long)]
        group: String,
        /// A comment about the deployment (default: "Deploy from CLI on <now>")
        #[arg(short, long)]
        description: Option<String>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Archive the source directory as it is, without the prepare command
        #[arg(long)]
        skip_prepare: bool,
    },
    /// Build the revision archive without uploading it.
    Pack {
        /// Archive the source directory as it is, without the prepare command
        #[arg(long)]
        skip_prepare: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "cdship=debug" } else { "cdship=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config_path = cli
        .config
        .or_else(|| std::env::var_os("CDSHIP_CONFIG").map(PathBuf::from));
    let config = ShipConfig::load(config_path.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Deploy {
            group,
            description,
            yes,
            skip_prepare,
        } => {
            let args = commands::deploy::DeployArgs {
                group,
                description,
                yes,
                skip_prepare,
            };
            commands::deploy::run(&config, args).await
        }
        Commands::Pack {
            skip_prepare,
            format,
        } => {
            commands::pack::run(&config, skip_prepare, &format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
