mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::Overrides;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "secretsync",
    about = "Sync Kamal deploy secrets from a local env file into Bitwarden Secrets Manager",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .secretsync.yaml, config/deploy.yml, or .git/)
    #[arg(long, global = true, env = "SECRETSYNC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what sync would create, update, or skip (no changes made)
    Plan,

    /// Push local secret values to the project and rewrite the Kamal secrets file
    Sync,

    /// Rewrite the Kamal secrets file only
    Reference,

    /// List the secrets the manifest requires and whether the env file has them
    Keys,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Plan => cmd::plan::run(&root, cli.overrides, cli.json),
        Commands::Sync => cmd::sync::run(&root, cli.overrides, cli.json),
        Commands::Reference => cmd::reference::run(&root, cli.overrides, cli.json),
        Commands::Keys => cmd::keys::run(&root, cli.overrides, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
